//! Command-line argument parsing for the tether CLI.

use thiserror::Error;

use crate::models::{ReportReason, ReportTarget, TargetKind};

/// Parsed CLI command to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Show version information
    Version,
    /// Show usage
    Help,
    /// Sign in; the password is prompted for
    Login { email: String },
    Logout,
    ChangePassword,
    Follow { kind: TargetKind, id: String },
    Unfollow { kind: TargetKind, id: String },
    Report {
        target: ReportTarget,
        reason: ReportReason,
        details: Option<String>,
    },
    /// Keep the session fresh and print notifications until Ctrl-C
    Watch,
}

/// Argument errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArgsError {
    #[error("missing {0}")]
    Missing(&'static str),

    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("'{0}' is not a follow target (expected user or team)")]
    InvalidFollowTarget(String),

    #[error("'{0}' cannot be reported (expected post, comment or user)")]
    InvalidReportTarget(String),

    #[error("unexpected argument '{0}'")]
    Unexpected(String),
}

pub const USAGE: &str = "\
Usage: tether <command>

Commands:
  login <email>                             Sign in (password is prompted)
  logout                                    Sign out and forget the session
  change-password                           Change the account password
  follow <user|team> <id>                   Follow a user or team
  unfollow <user|team> <id>                 Stop following
  report <post|comment|user> <id> <reason> [details...]
                                            Report content
  watch                                     Keep the session alive and print notifications

Options:
  -V, --version                             Print version
  -h, --help                                Print this help";

/// Parse command-line arguments (including the program name).
///
/// # Examples
///
/// ```
/// use tether::cli::args::{parse_args, CliCommand};
///
/// let args = vec!["tether".to_string(), "--version".to_string()];
/// assert_eq!(parse_args(args.into_iter()), Ok(CliCommand::Version));
/// ```
pub fn parse_args<I>(args: I) -> Result<CliCommand, ArgsError>
where
    I: Iterator<Item = String>,
{
    // Skip the program name
    let mut args = args.skip(1);
    let Some(command) = args.next() else {
        return Ok(CliCommand::Help);
    };

    let parsed = match command.as_str() {
        "--version" | "-V" | "version" => CliCommand::Version,
        "--help" | "-h" | "help" => CliCommand::Help,
        "login" => CliCommand::Login {
            email: args.next().ok_or(ArgsError::Missing("email"))?,
        },
        "logout" => CliCommand::Logout,
        "change-password" | "passwd" => CliCommand::ChangePassword,
        "follow" | "unfollow" => {
            let raw_kind = args.next().ok_or(ArgsError::Missing("target type"))?;
            let kind = TargetKind::parse(&raw_kind)
                .ok_or(ArgsError::InvalidFollowTarget(raw_kind))?;
            let id = args.next().ok_or(ArgsError::Missing("target id"))?;
            if command == "follow" {
                CliCommand::Follow { kind, id }
            } else {
                CliCommand::Unfollow { kind, id }
            }
        }
        "report" => {
            let raw_kind = args.next().ok_or(ArgsError::Missing("target type"))?;
            let id = args.next().ok_or(ArgsError::Missing("target id"))?;
            let target = ReportTarget::parse(&raw_kind, id)
                .ok_or(ArgsError::InvalidReportTarget(raw_kind))?;
            let reason = ReportReason::parse(&args.next().ok_or(ArgsError::Missing("reason"))?);
            let rest: Vec<String> = args.by_ref().collect();
            let details = if rest.is_empty() {
                None
            } else {
                Some(rest.join(" "))
            };
            return Ok(CliCommand::Report {
                target,
                reason,
                details,
            });
        }
        "watch" => CliCommand::Watch,
        other => return Err(ArgsError::UnknownCommand(other.to_string())),
    };

    match args.next() {
        Some(extra) => Err(ArgsError::Unexpected(extra)),
        None => Ok(parsed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliCommand, ArgsError> {
        let mut all = vec!["tether".to_string()];
        all.extend(args.iter().map(|s| s.to_string()));
        parse_args(all.into_iter())
    }

    #[test]
    fn test_parse_version_flag() {
        assert_eq!(parse(&["--version"]), Ok(CliCommand::Version));
        assert_eq!(parse(&["-V"]), Ok(CliCommand::Version));
    }

    #[test]
    fn test_parse_no_args_shows_help() {
        assert_eq!(parse(&[]), Ok(CliCommand::Help));
    }

    #[test]
    fn test_parse_login() {
        assert_eq!(
            parse(&["login", "ana@example.com"]),
            Ok(CliCommand::Login {
                email: "ana@example.com".to_string()
            })
        );
        assert_eq!(parse(&["login"]), Err(ArgsError::Missing("email")));
    }

    #[test]
    fn test_parse_follow_and_unfollow() {
        assert_eq!(
            parse(&["follow", "user", "42"]),
            Ok(CliCommand::Follow {
                kind: TargetKind::User,
                id: "42".to_string()
            })
        );
        assert_eq!(
            parse(&["unfollow", "team", "t-7"]),
            Ok(CliCommand::Unfollow {
                kind: TargetKind::Team,
                id: "t-7".to_string()
            })
        );
        assert_eq!(
            parse(&["follow", "post", "1"]),
            Err(ArgsError::InvalidFollowTarget("post".to_string()))
        );
        assert_eq!(parse(&["follow", "user"]), Err(ArgsError::Missing("target id")));
    }

    #[test]
    fn test_parse_report() {
        assert_eq!(
            parse(&["report", "comment", "c-1", "spam"]),
            Ok(CliCommand::Report {
                target: ReportTarget::Comment("c-1".to_string()),
                reason: ReportReason::Spam,
                details: None,
            })
        );
        assert_eq!(
            parse(&["report", "post", "p-9", "other", "copied", "my", "photo"]),
            Ok(CliCommand::Report {
                target: ReportTarget::Post("p-9".to_string()),
                reason: ReportReason::Other("other".to_string()),
                details: Some("copied my photo".to_string()),
            })
        );
        assert_eq!(
            parse(&["report", "team", "t", "spam"]),
            Err(ArgsError::InvalidReportTarget("team".to_string()))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse(&["--unknown"]),
            Err(ArgsError::UnknownCommand("--unknown".to_string()))
        );
        assert_eq!(
            parse(&["logout", "now"]),
            Err(ArgsError::Unexpected("now".to_string()))
        );
    }
}
