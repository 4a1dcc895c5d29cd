/// Format whole won with thousands separators: ₩1,234,567
pub fn won(val: i64) -> String {
    let digits = val.unsigned_abs().to_string();

    let mut with_commas = String::new();
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    if val < 0 {
        format!("-₩{with_commas}")
    } else {
        format!("₩{with_commas}")
    }
}
