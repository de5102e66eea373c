//! `writeText` and `writeBinary`: content for the command's output stream
//! (for example a print to stdout) rather than a working file.

use std::io::{self, Write};
use std::path::Path;

use protocol::{ArgMap, ProtocolError, Transform, keys};

use crate::error::EngineError;
use crate::session::Session;
use crate::step::Step;

const TEXT_HANDLE: &str = "writeText";
const BINARY_HANDLE: &str = "writeBinary";
const OUTPUT_NAME: &str = "<output>";

impl Session {
    /// `writeText`: writes canonical text translated to the client's line
    /// ending and charset, unless `trans=no`.
    pub(crate) fn write_text(&mut self, args: &ArgMap) -> Result<Step, EngineError> {
        let translate = match args.str(keys::TRANS) {
            None => true,
            Some(value) if value.eq_ignore_ascii_case("no") => false,
            Some(value) => return Err(ProtocolError::decode(keys::TRANS, value, "'no'").into()),
        };
        let data = args.bytes(keys::DATA).unwrap_or_default();

        let bytes = if translate {
            let transform =
                Transform::for_text(self.config.line_ending, &self.config.transform_options());
            if transform.is_identity() {
                data.to_vec()
            } else {
                let encoder = self.output_encoder.get_or_insert_with(|| transform.encoder());
                let mut out = Vec::with_capacity(data.len());
                if let Err(e) = encoder.encode(data, &mut out) {
                    return Ok(self.fail_output(
                        TEXT_HANDLE,
                        io::Error::new(io::ErrorKind::InvalidData, e),
                    ));
                }
                out
            }
        } else {
            data.to_vec()
        };
        Ok(self.emit_output(TEXT_HANDLE, &bytes))
    }

    /// `writeBinary`: writes bytes unchanged.
    pub(crate) fn write_binary(&mut self, args: &ArgMap) -> Result<Step, EngineError> {
        let data = args.bytes(keys::DATA).unwrap_or_default().to_vec();
        Ok(self.emit_output(BINARY_HANDLE, &data))
    }

    fn emit_output(&mut self, handle: &str, bytes: &[u8]) -> Step {
        if self.registry.get(handle).is_some_and(|r| r.error) {
            return Step::new();
        }
        let Some(output) = self.output.as_mut() else {
            logging::trace_transfer!("no output stream; dropping {} bytes", bytes.len());
            return Step::new();
        };
        match output.write_all(bytes) {
            Ok(()) => Step::new(),
            Err(e) => self.fail_output(handle, e),
        }
    }

    fn fail_output(&mut self, handle: &str, error: io::Error) -> Step {
        let mut step = Step::new();
        step.error(&EngineError::file_write(Path::new(OUTPUT_NAME), error));
        self.registry.get_or_create(handle).fail();
        step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use protocol::{FunctionCall, LineEnding, OutboundCall};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Shared(Rc<RefCell<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn call(session: &mut Session, name: &str, args: ArgMap) -> Result<Step, EngineError> {
        let mut sink: Vec<OutboundCall> = Vec::new();
        session.dispatch(&FunctionCall::new(name, args), &mut sink)
    }

    #[test]
    fn text_is_translated_unless_told_not_to() {
        let shared = Shared::default();
        let mut session = Session::new(EngineConfig {
            line_ending: LineEnding::CrLf,
            ..EngineConfig::default()
        });
        session.set_output(Box::new(shared.clone()));

        call(&mut session, "writeText", ArgMap::new().with("data", b"a\n".as_slice()))
            .expect("text");
        call(
            &mut session,
            "writeText",
            ArgMap::new().with("data", b"b\n".as_slice()).with("trans", "no"),
        )
        .expect("raw text");
        call(&mut session, "writeBinary", ArgMap::new().with("data", b"\x00\n".as_slice()))
            .expect("binary");

        assert_eq!(shared.0.borrow().as_slice(), b"a\r\nb\n\x00\n");
    }

    #[test]
    fn bad_trans_value_is_fatal() {
        let mut session = Session::default();
        let err = call(
            &mut session,
            "writeText",
            ArgMap::new().with("data", b"a".as_slice()).with("trans", "yes"),
        )
        .expect_err("fatal");
        assert!(err.is_fatal());
    }

    #[test]
    fn missing_output_drops_data() {
        let mut session = Session::default();
        let step = call(&mut session, "writeBinary", ArgMap::new().with("data", b"x".as_slice()))
            .expect("dropped");
        assert!(step.is_empty());
    }

    #[test]
    fn write_failure_reports_once() {
        let mut session = Session::default();
        session.set_output(Box::new(Broken));
        let first = call(&mut session, "writeBinary", ArgMap::new().with("data", b"x".as_slice()))
            .expect("recoverable");
        assert_eq!(first.messages().count(), 1);
        let second = call(&mut session, "writeBinary", ArgMap::new().with("data", b"y".as_slice()))
            .expect("no-op");
        assert!(second.is_empty());
    }
}
