//! compare captured program output against canonical testcase output
//!
//! The interpreter runs in the student's browser; only the captured
//! stdout reaches the backend, so judging is a pure string comparison.

use tracing::instrument;

/// comparison mode, stored per problem
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum MatchRule {
    Exact = 0,
    IgnoreTrailingWhitespace = 1,
}

impl From<i32> for MatchRule {
    fn from(value: i32) -> Self {
        match value {
            1 => MatchRule::IgnoreTrailingWhitespace,
            _ => MatchRule::Exact,
        }
    }
}

impl From<grpc::backend::MatchRule> for MatchRule {
    fn from(value: grpc::backend::MatchRule) -> Self {
        match value {
            grpc::backend::MatchRule::Exact => MatchRule::Exact,
            grpc::backend::MatchRule::IgnoreTrailingWhitespace => {
                MatchRule::IgnoreTrailingWhitespace
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Verdict {
    pub accept: bool,
    pub pass_case: u32,
    pub total_case: u32,
}

/// strip per-line trailing whitespace and trailing blank lines
fn normalize(raw: &str) -> String {
    let mut lines: Vec<&str> = raw.lines().map(str::trim_end).collect();
    while lines.last() == Some(&"") {
        lines.pop();
    }
    lines.join("\n")
}

fn output_match(rule: MatchRule, expected: &str, actual: &str) -> bool {
    match rule {
        MatchRule::Exact => expected == actual,
        MatchRule::IgnoreTrailingWhitespace => normalize(expected) == normalize(actual),
    }
}

/// Case count mismatch rejects outright, a client that ran fewer
/// cases than the problem defines did not complete the attempt.
#[instrument(skip_all, level = "debug", fields(total = expected.len()))]
pub fn judge(rule: MatchRule, expected: &[&str], actual: &[&str]) -> Verdict {
    let total_case = expected.len() as u32;
    if expected.len() != actual.len() {
        return Verdict {
            accept: false,
            pass_case: 0,
            total_case,
        };
    }
    let pass_case = expected
        .iter()
        .zip(actual.iter())
        .filter(|(e, a)| output_match(rule, e, a))
        .count() as u32;
    Verdict {
        accept: pass_case == total_case,
        pass_case,
        total_case,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn exact() {
        let v = judge(MatchRule::Exact, &["1\n2", "3"], &["1\n2", "3"]);
        assert!(v.accept);
        assert_eq!(v.pass_case, 2);

        let v = judge(MatchRule::Exact, &["1\n2"], &["1\n2 "]);
        assert!(!v.accept);
        assert_eq!(v.pass_case, 0);
    }

    #[test]
    fn trailing_whitespace() {
        let rule = MatchRule::IgnoreTrailingWhitespace;
        assert!(judge(rule, &["1 2\n3"], &["1 2 \n3\n\n"]).accept);
        // leading whitespace still counts
        assert!(!judge(rule, &["1 2"], &[" 1 2"]).accept);
    }

    #[test]
    fn case_count_mismatch() {
        let v = judge(MatchRule::Exact, &["1", "2"], &["1"]);
        assert!(!v.accept);
        assert_eq!(v.pass_case, 0);
        assert_eq!(v.total_case, 2);
    }

    #[test]
    fn partial_pass() {
        let v = judge(MatchRule::Exact, &["1", "2", "3"], &["1", "9", "3"]);
        assert!(!v.accept);
        assert_eq!(v.pass_case, 2);
        assert_eq!(v.total_case, 3);
    }
}
