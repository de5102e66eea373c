//! crates/transfer/src/session.rs
//! Per-connection engine state and the function-name router.
//!
//! A [`Session`] owns the handler registry, the engine configuration and the
//! command-scoped hooks (output stream, external merge file, progress
//! callback). One session serves one connection from one thread.
//!
//! # Example
//!
//! ```no_run
//! use protocol::{ArgMap, FunctionCall, OutboundCall};
//! use transfer::{EngineConfig, Session};
//!
//! # fn example() -> Result<(), transfer::EngineError> {
//! let mut session = Session::new(EngineConfig::default());
//! let mut replies: Vec<OutboundCall> = Vec::new();
//! let call = FunctionCall::new(
//!     "client-OpenFile",
//!     ArgMap::new()
//!         .with("handle", "h1")
//!         .with("path", "/ws/readme.txt")
//!         .with("type", "0"),
//! );
//! let step = session.dispatch(&call, &mut replies)?;
//! step.deliver(&mut replies)?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use protocol::{
    ArgMap, ContentEncoder, FileTypeSpec, FunctionCall, LineEnding, ProtocolError, ReplySink,
    Transform,
};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::registry::HandlerRegistry;
use crate::step::Step;

/// Callback receiving cumulative byte counts of the running transfer.
pub type ProgressFn = Box<dyn FnMut(u64)>;

/// Functions the engine handles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClientFunction {
    /// `open`: start materializing a file.
    OpenFile,
    /// `write`: append content to an open file.
    WriteFile,
    /// `writeText`: text for the command output.
    WriteText,
    /// `writeBinary`: bytes for the command output.
    WriteBinary,
    /// `close`: commit or discard an open file.
    CloseFile,
    /// `chmodFile`: update permissions and time.
    ChmodFile,
    /// `checkFile`: report type and state of a local file.
    CheckFile,
    /// `openMerge3`: start a three-way merge.
    OpenMerge3,
    /// `openMerge2`: start a two-way merge.
    OpenMerge2,
    /// `writeMerge`: one merge chunk.
    WriteMerge,
    /// `closeMerge`: resolve and finish a merge.
    CloseMerge,
    /// `move`: rename a working file.
    MoveFile,
    /// `delete`: remove a working file.
    DeleteFile,
    /// `sendFile`: stream a working file to the server.
    SendFile,
}

impl ClientFunction {
    /// Looks up a function by name. Both the short form (`open`) and the
    /// server's prefixed form (`client-OpenFile`) are accepted.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let short = name.strip_prefix("client-").unwrap_or(name);
        let function = match short {
            "open" | "OpenFile" => Self::OpenFile,
            "write" | "WriteFile" => Self::WriteFile,
            "writeText" | "WriteText" => Self::WriteText,
            "writeBinary" | "WriteBinary" => Self::WriteBinary,
            "close" | "CloseFile" => Self::CloseFile,
            "chmodFile" | "ChmodFile" => Self::ChmodFile,
            "checkFile" | "CheckFile" => Self::CheckFile,
            "openMerge3" | "OpenMerge3" => Self::OpenMerge3,
            "openMerge2" | "OpenMerge2" => Self::OpenMerge2,
            "writeMerge" | "WriteMerge" => Self::WriteMerge,
            "closeMerge" | "CloseMerge" => Self::CloseMerge,
            "move" | "MoveFile" => Self::MoveFile,
            "delete" | "DeleteFile" => Self::DeleteFile,
            "sendFile" | "SendFile" => Self::SendFile,
            _ => return None,
        };
        Some(function)
    }

    /// Short wire name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::OpenFile => "open",
            Self::WriteFile => "write",
            Self::WriteText => "writeText",
            Self::WriteBinary => "writeBinary",
            Self::CloseFile => "close",
            Self::ChmodFile => "chmodFile",
            Self::CheckFile => "checkFile",
            Self::OpenMerge3 => "openMerge3",
            Self::OpenMerge2 => "openMerge2",
            Self::WriteMerge => "writeMerge",
            Self::CloseMerge => "closeMerge",
            Self::MoveFile => "move",
            Self::DeleteFile => "delete",
            Self::SendFile => "sendFile",
        }
    }
}

/// Engine state for one connection.
pub struct Session {
    pub(crate) config: EngineConfig,
    pub(crate) registry: HandlerRegistry,
    pub(crate) output: Option<Box<dyn Write>>,
    pub(crate) output_encoder: Option<ContentEncoder>,
    pub(crate) external_merge_file: Option<PathBuf>,
    progress: Option<ProgressFn>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("output", &self.output.is_some())
            .field("external_merge_file", &self.external_merge_file)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Session {
    /// Creates a session with an empty registry.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            registry: HandlerRegistry::new(),
            output: None,
            output_encoder: None,
            external_merge_file: None,
            progress: None,
        }
    }

    /// Engine configuration.
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Mutable engine configuration; changes apply to later calls.
    pub const fn config_mut(&mut self) -> &mut EngineConfig {
        &mut self.config
    }

    /// Open exchanges.
    pub const fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Mutable access to open exchanges.
    pub const fn registry_mut(&mut self) -> &mut HandlerRegistry {
        &mut self.registry
    }

    /// Installs the stream `writeText` and `writeBinary` write to.
    pub fn set_output(&mut self, output: Box<dyn Write>) {
        self.output = Some(output);
        self.output_encoder = None;
    }

    /// Removes and returns the output stream.
    pub fn take_output(&mut self) -> Option<Box<dyn Write>> {
        self.output.take()
    }

    /// Routes the next merge to a file prepared by an external tool.
    pub fn set_external_merge_file(&mut self, path: impl Into<PathBuf>) {
        self.external_merge_file = Some(path.into());
    }

    /// Installs a progress callback.
    pub fn set_progress(&mut self, progress: impl FnMut(u64) + 'static) {
        self.progress = Some(Box::new(progress));
    }

    /// Removes the progress callback.
    pub fn clear_progress(&mut self) {
        self.progress = None;
    }

    pub(crate) fn report_progress(&mut self, bytes: u64) {
        if let Some(progress) = self.progress.as_mut() {
            progress(bytes);
        }
    }

    /// Ends the current command: drops every open exchange (removing their
    /// temp files) and the command-scoped hooks.
    pub fn end_command(&mut self) {
        if !self.registry.is_empty() {
            logging::trace_transfer!("dropping {} unfinished exchanges", self.registry.len());
        }
        self.registry.clear();
        self.output = None;
        self.output_encoder = None;
        self.external_merge_file = None;
    }

    /// Local path for a `path` argument. Relative paths resolve against the
    /// configured client root.
    pub(crate) fn local_path(&self, raw: &str) -> PathBuf {
        let path = Path::new(raw);
        match &self.config.client_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Decodes a type argument, filling in the configured line ending when
    /// the server left it to the client.
    pub(crate) fn file_type(
        &self,
        args: &ArgMap,
        key: &str,
    ) -> Result<FileTypeSpec, ProtocolError> {
        let spec = FileTypeSpec::decode_field(key, args.str(key))?;
        Ok(self.with_default_line_ending(spec))
    }

    pub(crate) fn with_default_line_ending(&self, spec: FileTypeSpec) -> FileTypeSpec {
        if spec.line_ending() == LineEnding::Local {
            spec.with_line_ending(self.config.line_ending)
        } else {
            spec
        }
    }

    /// Transform for content of `spec`.
    pub(crate) fn transform(&self, spec: &FileTypeSpec) -> Transform {
        Transform::for_file(spec, &self.config.transform_options())
    }

    /// Runs one function call.
    ///
    /// Recoverable failures are reported as messages inside the returned
    /// [`Step`]; only fatal errors (unknown handle, undecodable arguments,
    /// transport failure) come back as `Err`. `sendFile` writes its packets
    /// straight to `sink`; every other function leaves delivery of its
    /// replies to the caller.
    pub fn dispatch(
        &mut self,
        call: &FunctionCall,
        sink: &mut dyn ReplySink,
    ) -> Result<Step, EngineError> {
        let Some(function) = ClientFunction::from_name(&call.name) else {
            return Err(
                ProtocolError::decode("func", call.name.as_str(), "a client function").into(),
            );
        };
        logging::trace_proto!("dispatch {} ({} args)", function.name(), call.args.len());
        let args = &call.args;
        match function {
            ClientFunction::OpenFile => self.open_file(args),
            ClientFunction::WriteFile => self.write_file(args),
            ClientFunction::WriteText => self.write_text(args),
            ClientFunction::WriteBinary => self.write_binary(args),
            ClientFunction::CloseFile => self.close_file(args),
            ClientFunction::ChmodFile => self.chmod_file(args),
            ClientFunction::CheckFile => self.check_file(args),
            ClientFunction::OpenMerge3 => self.open_merge(args, false),
            ClientFunction::OpenMerge2 => self.open_merge(args, true),
            ClientFunction::WriteMerge => self.write_merge(args),
            ClientFunction::CloseMerge => self.close_merge(args),
            ClientFunction::MoveFile => self.move_file(args),
            ClientFunction::DeleteFile => self.delete_file(args),
            ClientFunction::SendFile => self.send_file(args, sink),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::OutboundCall;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn names_resolve_in_both_forms() {
        assert_eq!(ClientFunction::from_name("open"), Some(ClientFunction::OpenFile));
        assert_eq!(
            ClientFunction::from_name("client-OpenFile"),
            Some(ClientFunction::OpenFile)
        );
        assert_eq!(
            ClientFunction::from_name("client-SendFile"),
            Some(ClientFunction::SendFile)
        );
        assert_eq!(ClientFunction::from_name("client-Prompt"), None);
    }

    #[test]
    fn unknown_function_is_fatal() {
        let mut session = Session::default();
        let mut sink: Vec<OutboundCall> = Vec::new();
        let err = session
            .dispatch(&FunctionCall::new("client-Prompt", ArgMap::new()), &mut sink)
            .expect_err("not handled");
        assert!(err.is_fatal());
    }

    #[test]
    fn relative_paths_use_client_root() {
        let session = Session::new(EngineConfig {
            client_root: Some(PathBuf::from("/ws")),
            ..EngineConfig::default()
        });
        assert_eq!(session.local_path("a/b.txt"), Path::new("/ws/a/b.txt"));
        assert_eq!(session.local_path("/abs/c"), Path::new("/abs/c"));
    }

    #[test]
    fn progress_callback_sees_counts() {
        let seen = Rc::new(Cell::new(0));
        let mut session = Session::default();
        let sink = Rc::clone(&seen);
        session.set_progress(move |bytes| sink.set(bytes));
        session.report_progress(42);
        assert_eq!(seen.get(), 42);
    }

    #[test]
    fn local_line_ending_takes_configured_default() {
        let session = Session::new(EngineConfig {
            line_ending: LineEnding::CrLf,
            ..EngineConfig::default()
        });
        let args = ArgMap::new().with("type", "0");
        let spec = session.file_type(&args, "type").expect("type");
        assert_eq!(spec.line_ending(), LineEnding::CrLf);

        let explicit = ArgMap::new().with("type", "01");
        let spec = session.file_type(&explicit, "type").expect("type");
        assert_eq!(spec.line_ending(), LineEnding::Lf);
    }
}
