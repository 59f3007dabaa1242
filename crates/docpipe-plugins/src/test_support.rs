use std::collections::HashMap;
use std::sync::Mutex;

use docpipe_core::{CommandOutput, CommandSpec, ProcessRunner};

/// Answers commands from a table keyed by the full command line
#[derive(Default)]
pub struct ScriptedRunner {
    replies: HashMap<String, CommandOutput>,
    pub calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, command: &str, stdout: &str) -> Self {
        self.replies.insert(
            command.to_string(),
            CommandOutput {
                success: true,
                code: Some(0),
                stdout: stdout.as_bytes().to_vec(),
                stderr: Vec::new(),
            },
        );
        self
    }

    pub fn fail(mut self, command: &str) -> Self {
        self.replies.insert(
            command.to_string(),
            CommandOutput {
                success: false,
                code: Some(1),
                stdout: Vec::new(),
                stderr: b"failed".to_vec(),
            },
        );
        self
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run(&self, spec: &CommandSpec) -> anyhow::Result<CommandOutput> {
        self.calls.lock().unwrap().push(spec.clone());
        self.replies
            .get(&spec.display())
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Command not found: {}", spec.program))
    }
}
