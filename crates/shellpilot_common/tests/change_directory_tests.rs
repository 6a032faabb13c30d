//! `cd` through the real executor
//!
//! Kept in its own test binary: changing the working directory is
//! process-wide and would race the other integration tests.

use shellpilot_common::executor::{ExecutionMode, Executor};
use shellpilot_common::gateway::ProviderGateway;
use shellpilot_common::provider::FakeGenerator;
use shellpilot_common::workflow::ScriptedPrompter;
use shellpilot_common::{AliasTable, Ending, Session, SessionLimits, SystemContext};
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_direct_cd_moves_the_session() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().canonicalize().unwrap();
    let fake = Arc::new(FakeGenerator::always("unused"));
    let gateway = ProviderGateway::new(fake.clone(), 256, SystemContext::default());
    let mut session = Session::new(
        gateway,
        AliasTable::in_memory(),
        Box::new(Executor::new()),
        SessionLimits::default(),
    );
    let mut prompter = ScriptedPrompter::new(&[], &[]);

    let outcome = session
        .handle_direct(&format!("cd {}", target.display()), &mut prompter)
        .unwrap();

    assert_eq!(outcome.ending, Ending::Finished);
    assert_eq!(outcome.last_exit_code(), Some(0));
    assert_eq!(outcome.executed[0].result.mode, ExecutionMode::ChangeDirectory);
    assert_eq!(std::env::current_dir().unwrap().canonicalize().unwrap(), target);

    // The next line runs in the new directory
    let outcome = session.handle_direct("cd..", &mut prompter).unwrap();
    assert_eq!(outcome.last_exit_code(), Some(0));
    assert_eq!(
        std::env::current_dir().unwrap().canonicalize().unwrap(),
        target.parent().unwrap()
    );

    assert_eq!(fake.call_count(), 0);
}
