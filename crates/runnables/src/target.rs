//! Expected artifact kind and name, inferred from build-tool arguments

use std::fmt;

use crate::artifact::BuildTarget;

/// Artifact kind selected by a target flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Bin,
    Lib,
    Test,
    Example,
    Bench,
}

impl TargetKind {
    /// Kind for a `--bin`-style flag
    pub fn from_flag(flag: &str) -> Option<Self> {
        match flag {
            "--bin" => Some(Self::Bin),
            "--lib" => Some(Self::Lib),
            "--test" => Some(Self::Test),
            "--example" => Some(Self::Example),
            "--bench" => Some(Self::Bench),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bin => "bin",
            Self::Lib => "lib",
            Self::Test => "test",
            Self::Example => "example",
            Self::Bench => "bench",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter applied to compiler artifacts. `None` accepts anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpectedTarget {
    pub kind: Option<TargetKind>,
    pub name: Option<String>,
}

impl ExpectedTarget {
    /// Infer the filter from the runnable's original build-tool arguments
    pub fn from_args(args: &[String]) -> Self {
        let mut expected = Self::default();

        for (i, arg) in args.iter().enumerate() {
            if let Some(kind) = TargetKind::from_flag(arg) {
                expected.kind = Some(kind);
                if kind != TargetKind::Lib {
                    expected.name = args.get(i + 1).cloned();
                }
                break;
            }
        }

        let lib_or_unknown = matches!(expected.kind, None | Some(TargetKind::Lib));
        if expected.name.is_none() && lib_or_unknown {
            expected.name = args
                .iter()
                .position(|arg| arg == "--package")
                .and_then(|i| args.get(i + 1))
                .cloned();
        }

        expected
    }

    pub fn matches(&self, target: &BuildTarget) -> bool {
        let kind_ok = self
            .kind
            .map_or(true, |kind| target.kind.iter().any(|k| k == kind.as_str()));
        let name_ok = self.name.as_ref().map_or(true, |name| &target.name == name);
        kind_ok && name_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected(args: &[&str]) -> ExpectedTarget {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        ExpectedTarget::from_args(&args)
    }

    fn target(kind: &[&str], name: &str) -> BuildTarget {
        BuildTarget {
            kind: kind.iter().map(|s| s.to_string()).collect(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_bin_with_name() {
        let e = expected(&["run", "--bin", "foo"]);
        assert_eq!(e.kind, Some(TargetKind::Bin));
        assert_eq!(e.name.as_deref(), Some("foo"));
    }

    #[test]
    fn test_lib_alone() {
        assert_eq!(
            expected(&["test", "--lib"]),
            ExpectedTarget { kind: Some(TargetKind::Lib), name: None }
        );
    }

    #[test]
    fn test_lib_with_package() {
        let e = expected(&["test", "--lib", "--package", "bar"]);
        assert_eq!(e.kind, Some(TargetKind::Lib));
        assert_eq!(e.name.as_deref(), Some("bar"));
    }

    #[test]
    fn test_nothing() {
        assert_eq!(expected(&["build"]), ExpectedTarget::default());
        assert_eq!(expected(&[]), ExpectedTarget::default());
    }

    #[test]
    fn test_package_without_kind_flag() {
        assert_eq!(expected(&["test", "--package", "core"]).name.as_deref(), Some("core"));
    }

    #[test]
    fn test_first_kind_flag_wins() {
        let e = expected(&["test", "--test", "integration", "--bin", "app"]);
        assert_eq!(e.kind, Some(TargetKind::Test));
        assert_eq!(e.name.as_deref(), Some("integration"));
    }

    #[test]
    fn test_named_kind_ignores_package() {
        let e = expected(&["test", "--package", "core", "--example", "demo"]);
        assert_eq!(e.kind, Some(TargetKind::Example));
        assert_eq!(e.name.as_deref(), Some("demo"));
    }

    #[test]
    fn test_trailing_flag_without_name() {
        let e = expected(&["run", "--bin"]);
        assert_eq!(e.kind, Some(TargetKind::Bin));
        assert_eq!(e.name, None);
    }

    #[test]
    fn test_matches() {
        let e = expected(&["run", "--bin", "foo"]);
        assert!(e.matches(&target(&["bin"], "foo")));
        assert!(!e.matches(&target(&["bin"], "bar")));
        assert!(!e.matches(&target(&["lib"], "foo")));
        assert!(ExpectedTarget::default().matches(&target(&["cdylib"], "anything")));
        assert!(expected(&["--lib"]).matches(&target(&["lib", "rlib"], "x")));
    }
}
