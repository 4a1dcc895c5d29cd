use std::sync::OnceLock;

use regex::Regex;

/// Known member names. Matching is exact; order decides which member wins a
/// substring scan when a memo mentions more than one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    names: Vec<String>,
}

fn paren_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(([^()]+)\)").expect("static regex"))
}

fn prefix_res() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        [r"간편이체\((.+?)\)", r"간편이체 취소\((.+?)\)"]
            .into_iter()
            .map(|p| Regex::new(p).expect("static regex"))
            .collect()
    })
}

impl Roster {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = Vec::new();
        for name in names {
            let name: String = name.into();
            let name = name.trim().to_string();
            if !name.is_empty() && !seen.contains(&name) {
                seen.push(name);
            }
        }
        Self { names: seen }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Attribute a memo to a member. The depositor field, when the bank
    /// supplies one, is checked before the free-text description.
    pub fn extract(&self, description: &str, depositor_name: &str) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        if !depositor_name.trim().is_empty() {
            if let Some(name) = self.from_text(depositor_name) {
                return Some(name);
            }
        }
        if let Some(name) = self.from_text(description) {
            return Some(name);
        }
        self.from_prefixed(description)
    }

    fn from_text(&self, text: &str) -> Option<String> {
        self.in_parens(text).or_else(|| self.mentioned_in(text))
    }

    /// First parenthesized group that names a member; other groups
    /// (branch names, card labels) are passed over.
    fn in_parens(&self, text: &str) -> Option<String> {
        paren_re()
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .find(|name| self.contains(name))
            .map(str::to_string)
    }

    fn mentioned_in(&self, text: &str) -> Option<String> {
        self.names.iter().find(|n| text.contains(n.as_str())).cloned()
    }

    fn from_prefixed(&self, description: &str) -> Option<String> {
        for re in prefix_res() {
            let Some(caps) = re.captures(description) else { continue };
            if let Some(m) = caps.get(1) {
                let name = m.as_str().trim();
                if self.contains(name) {
                    return Some(name.to_string());
                }
            }
        }
        let whole = description.trim();
        self.contains(whole).then(|| whole.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Roster {
        Roster::new(["이동혁", "김민주", "박진복", "Kim Minju"])
    }

    #[test]
    fn test_depositor_parens_win() {
        let r = roster();
        assert_eq!(r.extract("회비", "카카오(김민주)").as_deref(), Some("김민주"));
    }

    #[test]
    fn test_depositor_beats_description() {
        let r = roster();
        assert_eq!(r.extract("이동혁 회비", "박진복").as_deref(), Some("박진복"));
    }

    #[test]
    fn test_unknown_paren_falls_back_to_substring() {
        let r = roster();
        assert_eq!(r.extract("", "홍길동(외부) 이동혁").as_deref(), Some("이동혁"));
    }

    #[test]
    fn test_later_paren_group_beats_roster_scan() {
        let r = roster();
        assert_eq!(r.extract("(x) 이동혁 (김민주)", "").as_deref(), Some("김민주"));
        assert_eq!(r.extract("", "신한(역삼) 카카오(박진복)").as_deref(), Some("박진복"));
    }

    #[test]
    fn test_description_parens() {
        let r = roster();
        assert_eq!(r.extract("간편이체(김민주)", "").as_deref(), Some("김민주"));
        assert_eq!(r.extract("simple-transfer(Kim Minju)", "").as_deref(), Some("Kim Minju"));
    }

    #[test]
    fn test_exact_name_description() {
        let r = roster();
        assert_eq!(r.extract("  박진복 ", "").as_deref(), Some("박진복"));
    }

    #[test]
    fn test_no_match() {
        let r = roster();
        assert_eq!(r.extract("ATM 출금", ""), None);
        assert_eq!(r.extract("간편이체(홍길동)", "홍길동"), None);
        assert_eq!(Roster::default().extract("김민주", "김민주"), None);
    }

    #[test]
    fn test_roster_order_decides_substring_scan() {
        let r = roster();
        assert_eq!(r.extract("김민주 이동혁", "").as_deref(), Some("이동혁"));
    }

    #[test]
    fn test_roster_dedupes_and_trims() {
        let r = Roster::new([" 김민주", "김민주", ""]);
        assert_eq!(r.names(), &["김민주".to_string()]);
    }
}
