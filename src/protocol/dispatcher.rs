use crate::core::package::Package;
use crate::error::{constants, IndexerError, Result};
use crate::protocol::message::{Command, Request, Response};
use crate::registry::PackageIndex;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

type HandlerFn = dyn Fn(Package) -> Response + Send + Sync + 'static;

/// Routes decoded requests to package index operations by command opcode.
/// Uses Cow<'static, str> to avoid heap allocations for the built-in commands.
pub struct Dispatcher {
    handlers: Arc<RwLock<HashMap<Cow<'static, str>, Box<HandlerFn>>>>,
}

impl Dispatcher {
    /// Dispatcher with no routes at all; every request is an unknown command
    #[cfg(test)]
    fn empty() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Dispatcher routing `INDEX`, `REMOVE` and `QUERY` to `index`
    pub fn new(index: Arc<dyn PackageIndex>) -> Self {
        let mut handlers: HashMap<Cow<'static, str>, Box<HandlerFn>> = HashMap::new();

        let target = Arc::clone(&index);
        handlers.insert(
            Cow::Borrowed("INDEX"),
            Box::new(move |pkg: Package| -> Response { target.index(pkg).into() }),
        );

        let target = Arc::clone(&index);
        handlers.insert(
            Cow::Borrowed("REMOVE"),
            Box::new(move |pkg: Package| -> Response { target.remove(pkg.name()).into() }),
        );

        let target = index;
        handlers.insert(
            Cow::Borrowed("QUERY"),
            Box::new(move |pkg: Package| -> Response { target.query(pkg.name()).into() }),
        );

        Self {
            handlers: Arc::new(RwLock::new(handlers)),
        }
    }

    /// Add or replace the handler for `opcode`
    pub fn register<F>(&self, opcode: &str, handler: F) -> Result<()>
    where
        F: Fn(Package) -> Response + Send + Sync + 'static,
    {
        let mut handlers = self.handlers.write().map_err(|_| {
            IndexerError::Custom(constants::ERR_DISPATCHER_WRITE_LOCK.to_string())
        })?;

        handlers.insert(Cow::Owned(opcode.to_string()), Box::new(handler));
        Ok(())
    }

    /// Apply a decoded request. Unrouted commands yield [`IndexerError::UnknownCommand`].
    pub fn dispatch(&self, req: Request) -> Result<Response> {
        let handlers = self.handlers.read().map_err(|_| {
            IndexerError::Custom(constants::ERR_DISPATCHER_READ_LOCK.to_string())
        })?;

        let Request { command, package } = req;
        match handlers.get(get_opcode(&command).as_ref()) {
            Some(handler) => Ok(handler(package)),
            None => Err(IndexerError::UnknownCommand(command.as_str().to_string())),
        }
    }

    /// Decode and apply one raw line.
    ///
    /// Always produces a response; any decode or dispatch failure becomes
    /// [`Response::Error`] and is handed back for reporting.
    pub fn respond(&self, line: &str) -> (Response, Option<IndexerError>) {
        match Request::parse(line).and_then(|req| self.dispatch(req)) {
            Ok(response) => (response, None),
            Err(e) => (Response::Error, Some(e)),
        }
    }
}

/// Routing key for a command (zero-copy for the built-in commands).
#[inline]
fn get_opcode(command: &Command) -> Cow<'_, str> {
    match command {
        Command::Index => Cow::Borrowed("INDEX"),
        Command::Remove => Cow::Borrowed("REMOVE"),
        Command::Query => Cow::Borrowed("QUERY"),
        Command::Unknown(token) => Cow::Borrowed(token.as_str()),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::registry::{Registry, Status};

    /// Answers OK to everything
    struct AlwaysOk;

    impl PackageIndex for AlwaysOk {
        fn index(&self, _pkg: Package) -> Status {
            Status::Ok
        }

        fn remove(&self, _name: &str) -> Status {
            Status::Ok
        }

        fn query(&self, _name: &str) -> Status {
            Status::Ok
        }
    }

    #[test]
    fn routes_known_commands() {
        let dispatcher = Dispatcher::new(Arc::new(AlwaysOk));

        for line in [
            "INDEX|ccng|libcurl\n",
            "REMOVE|ccng|libcurl\n",
            "QUERY|ccng|libcurl\n",
        ] {
            let (response, err) = dispatcher.respond(line);
            assert_eq!(response, Response::Ok, "{line:?}");
            assert!(err.is_none());
        }
    }

    #[test]
    fn unknown_command_is_a_protocol_error() {
        let dispatcher = Dispatcher::new(Arc::new(AlwaysOk));
        let (response, err) = dispatcher.respond("UNKNOWN|ccng|libcurl\n");
        assert_eq!(response, Response::Error);
        assert!(matches!(err, Some(IndexerError::UnknownCommand(c)) if c == "UNKNOWN"));
    }

    #[test]
    fn decode_failures_are_handed_back() {
        let dispatcher = Dispatcher::new(Arc::new(AlwaysOk));

        let (response, err) = dispatcher.respond("");
        assert_eq!(response, Response::Error);
        assert_eq!(err.unwrap().to_string(), constants::ERR_MALFORMED_MESSAGE);

        let (response, err) = dispatcher.respond("|ccng|libcurl\n");
        assert_eq!(response, Response::Error);
        assert_eq!(err.unwrap().to_string(), constants::ERR_MISSING_COMMAND);

        let (response, err) = dispatcher.respond("INDEX||libcurl\n");
        assert_eq!(response, Response::Error);
        assert_eq!(err.unwrap().to_string(), constants::ERR_MISSING_PACKAGE_NAME);
    }

    #[test]
    fn registry_outcomes_map_to_responses() {
        let dispatcher = Dispatcher::new(Arc::new(Registry::new()));

        assert_eq!(dispatcher.respond("QUERY|a|\n").0, Response::Fail);
        assert_eq!(dispatcher.respond("INDEX|b|a\n").0, Response::Fail);
        assert_eq!(dispatcher.respond("INDEX|a|\n").0, Response::Ok);
        assert_eq!(dispatcher.respond("INDEX|b|a\n").0, Response::Ok);
        assert_eq!(dispatcher.respond("REMOVE|a|\n").0, Response::Fail);
        assert_eq!(dispatcher.respond("REMOVE|b|\n").0, Response::Ok);
        assert_eq!(dispatcher.respond("REMOVE|a|\n").0, Response::Ok);
    }

    #[test]
    fn custom_handlers_can_be_registered() {
        let dispatcher = Dispatcher::new(Arc::new(Registry::new()));
        dispatcher
            .register("PING", |_pkg| Response::Ok)
            .expect("register");

        assert_eq!(dispatcher.respond("PING|x|\n").0, Response::Ok);
    }

    #[test]
    fn empty_dispatcher_rejects_everything() {
        let dispatcher = Dispatcher::empty();
        let (response, err) = dispatcher.respond("QUERY|a|\n");
        assert_eq!(response, Response::Error);
        assert!(matches!(err, Some(IndexerError::UnknownCommand(_))));
    }
}
