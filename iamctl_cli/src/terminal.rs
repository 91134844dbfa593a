//! Terminal detection and capability utilities

use is_terminal::IsTerminal;
use std::env;
use std::io::{stderr, stdin, stdout};

/// Environment variables set by common CI systems
const CI_VARS: &[&str] = &[
    "CI",
    "CONTINUOUS_INTEGRATION",
    "JENKINS_URL",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "TRAVIS",
    "CIRCLECI",
    "BUILDKITE",
    "DRONE",
    "TEAMCITY_VERSION",
    "TF_BUILD", // Azure DevOps
];

/// Check if stdout is connected to an interactive terminal
pub fn is_interactive() -> bool {
    if !stdout().is_terminal() {
        return false;
    }

    // CI runners may allocate a TTY
    if is_ci_environment() {
        return false;
    }

    env::var("DEBIAN_FRONTEND").unwrap_or_default() != "noninteractive"
}

/// Check if the user can answer a confirmation prompt
pub fn can_prompt() -> bool {
    is_interactive() && stdin().is_terminal() && stderr().is_terminal()
}

/// Check if the terminal supports ANSI escape codes for colors and progress bars
pub fn supports_ansi() -> bool {
    if !is_interactive() {
        return false;
    }

    if env::var_os("NO_COLOR").is_some() {
        return false;
    }

    let term = env::var("TERM").unwrap_or_default();
    #[cfg(windows)]
    if term.is_empty() {
        // Windows Terminal and ConEmu leave TERM unset
        return env::var("WT_SESSION").is_ok()
            || env::var("ConEmuANSI").unwrap_or_default() == "ON";
    }

    !(term == "dumb" || term.is_empty())
}

fn is_ci_environment() -> bool {
    CI_VARS.iter().any(|var| env::var(var).is_ok())
}

/// Progress bars are drawn only when stderr is an ANSI-capable terminal
pub fn should_show_progress_by_default() -> bool {
    is_interactive() && stderr().is_terminal() && supports_ansi()
}
