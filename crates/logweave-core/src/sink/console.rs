//! Console sink.

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{LogSink, SinkCore};
use crate::error::LogResult;
use crate::execution::ExecutionMethod;
use crate::types::LogEntity;

/// Where the console sink writes.
#[derive(Clone, Default)]
pub enum ConsoleOutput {
    /// One line on stdout.
    #[default]
    Print,
    /// One line on stdout, rendered with `Debug` (quoted and escaped).
    DebugPrint,
    /// One line on stderr.
    Stderr,
    /// A caller-supplied writer.
    Writer(Arc<Mutex<Box<dyn Write + Send>>>),
}

impl ConsoleOutput {
    pub fn writer(writer: impl Write + Send + 'static) -> Self {
        ConsoleOutput::Writer(Arc::new(Mutex::new(Box::new(writer))))
    }

    fn emit(&self, text: &str) -> LogResult<()> {
        match self {
            // println! would panic on a closed stream
            ConsoleOutput::Print => writeln!(std::io::stdout().lock(), "{text}")?,
            ConsoleOutput::DebugPrint => writeln!(std::io::stdout().lock(), "{text:?}")?,
            ConsoleOutput::Stderr => writeln!(std::io::stderr().lock(), "{text}")?,
            ConsoleOutput::Writer(writer) => {
                let mut writer = writer.lock();
                writeln!(writer, "{text}")?;
                writer.flush()?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ConsoleOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsoleOutput::Print => f.write_str("Print"),
            ConsoleOutput::DebugPrint => f.write_str("DebugPrint"),
            ConsoleOutput::Stderr => f.write_str("Stderr"),
            ConsoleOutput::Writer(_) => f.write_str("Writer"),
        }
    }
}

#[derive(Debug)]
pub struct ConsoleSink {
    core: Arc<SinkCore>,
    output: ConsoleOutput,
    execution: ExecutionMethod,
}

impl ConsoleSink {
    pub fn new(core: SinkCore, output: ConsoleOutput, execution: ExecutionMethod) -> Self {
        Self {
            core: Arc::new(core),
            output,
            execution,
        }
    }

    /// Block until queued writes have been emitted.
    pub fn wait_until_idle(&self) {
        self.execution.wait_until_idle();
    }
}

impl LogSink for ConsoleSink {
    fn core(&self) -> &SinkCore {
        &self.core
    }

    fn log(&self, entity: &LogEntity) {
        let core = self.core.clone();
        let output = self.output.clone();
        let entity = entity.clone();

        self.execution.perform(move || {
            core.deliver(&entity, |text| output.emit(text));
        });
    }
}
