//! # Classified outcome of a single process run.
//!
//! [`ExitReason`] is derived jointly from the OS exit status, the stderr
//! buffer, and the output classifier's verdict (see
//! [`runner`](crate::process::runner) for the reconciliation order). The
//! session maps each reason to a restart decision via
//! [`RestartPolicy::decide`](crate::policies::RestartPolicy::decide).

/// Classified cause of one process run's termination.
///
/// ## Reconciliation precedence
/// 1. Supervising context cancelled → [`ExitReason::GlobalShutdown`],
///    regardless of what the OS reports.
/// 2. Shutdown marker observed in output → [`ExitReason::ManualShutdown`],
///    even on a non-zero exit code.
/// 3. Otherwise the OS status and spawn errors decide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// An admin issued the in-process shutdown command; the marker line was
    /// observed in the child's output. Not restarted.
    ManualShutdown {
        /// Actor identifier captured from the marker line (logging only).
        actor: String,
    },

    /// The supervising context was cancelled: OS signal or schedule
    /// deadline. Not restarted within this session.
    GlobalShutdown,

    /// The executable is not valid for this host platform. Fatal, never
    /// retried.
    ExecFormatError,

    /// The child could not acquire one of its network ports (exit status
    /// 255). Retried after an extended cooldown.
    PortConflict,

    /// Any other failure: non-zero exit, termination by signal, a spawn or
    /// log-file setup error. Retried after the flat cooldown.
    OtherError {
        /// Detail for narration (stderr excerpt, I/O error text).
        message: String,
    },

    /// The process exited cleanly without being asked to. Still not a
    /// requested shutdown, so it is retried like any other exit.
    CleanExit,
}

impl ExitReason {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ExitReason::ManualShutdown { .. } => "manual_shutdown",
            ExitReason::GlobalShutdown => "global_shutdown",
            ExitReason::ExecFormatError => "exec_format_error",
            ExitReason::PortConflict => "port_conflict",
            ExitReason::OtherError { .. } => "error",
            ExitReason::CleanExit => "clean_exit",
        }
    }

    /// True for the two requested-shutdown reasons. These are successful
    /// terminations, never restarted.
    pub fn is_shutdown(&self) -> bool {
        matches!(
            self,
            ExitReason::ManualShutdown { .. } | ExitReason::GlobalShutdown
        )
    }

    /// True when no further attempt may be made for this unit.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExitReason::ExecFormatError)
    }

    /// True when the session may spawn the process again.
    pub fn is_retryable(&self) -> bool {
        !self.is_shutdown() && !self.is_fatal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_reasons_are_never_retryable() {
        let manual = ExitReason::ManualShutdown { actor: "7".into() };
        assert!(manual.is_shutdown());
        assert!(!manual.is_retryable());

        assert!(ExitReason::GlobalShutdown.is_shutdown());
        assert!(!ExitReason::GlobalShutdown.is_retryable());
    }

    #[test]
    fn test_exec_format_is_fatal_not_retryable() {
        assert!(ExitReason::ExecFormatError.is_fatal());
        assert!(!ExitReason::ExecFormatError.is_retryable());
        assert!(!ExitReason::ExecFormatError.is_shutdown());
    }

    #[test]
    fn test_crash_and_clean_exits_are_retryable() {
        assert!(ExitReason::PortConflict.is_retryable());
        assert!(ExitReason::CleanExit.is_retryable());
        let other = ExitReason::OtherError {
            message: "exit status 1".into(),
        };
        assert!(other.is_retryable());
    }

    #[test]
    fn test_labels_are_stable() {
        assert_eq!(ExitReason::PortConflict.as_label(), "port_conflict");
        assert_eq!(ExitReason::CleanExit.as_label(), "clean_exit");
        assert_eq!(ExitReason::GlobalShutdown.as_label(), "global_shutdown");
    }
}
