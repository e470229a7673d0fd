//! Declarative command/flag registry with parsing, dispatch and help rendering.
//!
//! A [`Registry`] is filled during program setup (global flags, top-level and
//! nested commands, per-command flags), then used read-only to:
//! - parse a flat argument vector into [`ParsedArguments`]
//! - validate required flags
//! - dispatch to the handler registered for the matched command path
//! - render top-level or per-command help
//!
//! Parsing never panics and never runs a handler; failures are reported through
//! [`ParsedArguments::error`].

pub mod error {
    /// Reasons a parse can fail.
    #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
    pub enum ParseError {
        #[error("No command specified")]
        NoCommandSpecified,
        #[error("Unknown command: {0}")]
        UnknownCommand(String),
        #[error("Unknown flag: {0}")]
        UnknownFlag(String),
        #[error("Missing required flag: {0}")]
        MissingRequiredFlag(String),
    }
}

pub mod args {
    use super::error::ParseError;
    use indexmap::IndexMap;

    /// Whether a flag is presence-only or collects values.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum FlagKind {
        /// `-v`, `--verbose`
        Boolean,
        /// `-f a b`, `--files a b`, `--files=a,b`
        MultiArg,
    }

    /// A registered flag definition.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct FlagSpec {
        pub short_name: Option<String>,
        pub long_name: Option<String>,
        pub kind: FlagKind,
        pub description: String,
        pub required: bool,
    }

    impl FlagSpec {
        /// Build a spec from a combined names token such as `"-v,--verbose"`,
        /// `"--debug"` or `"-d"`.
        ///
        /// Returns `None` when neither a short nor a long name is present.
        pub fn from_names(
            names: &str,
            kind: FlagKind,
            description: impl Into<String>,
            required: bool,
        ) -> Option<Self> {
            let (short_name, long_name) = split_names(names);
            if short_name.is_none() && long_name.is_none() {
                return None;
            }
            Some(Self {
                short_name,
                long_name,
                kind,
                description: description.into(),
                required,
            })
        }

        /// The key under which this flag's value is stored: long name if
        /// registered, else short name.
        pub fn canonical_name(&self) -> &str {
            self.long_name
                .as_deref()
                .or(self.short_name.as_deref())
                .unwrap_or_default()
        }

        pub fn matches(&self, token: &str) -> bool {
            self.short_name.as_deref() == Some(token) || self.long_name.as_deref() == Some(token)
        }
    }

    fn non_empty(raw: &str) -> Option<String> {
        (!raw.is_empty()).then(|| raw.to_string())
    }

    fn split_names(names: &str) -> (Option<String>, Option<String>) {
        const BLANK: [char; 2] = [' ', '\t'];
        match names.split_once(',') {
            Some((first, second)) => {
                let first = first.trim_matches(BLANK);
                let second = second.trim_matches(BLANK);
                if first.starts_with("--") {
                    (non_empty(second), non_empty(first))
                } else {
                    (non_empty(first), non_empty(second))
                }
            }
            None => {
                let name = names.trim_matches(BLANK);
                if name.starts_with("--") {
                    (None, non_empty(name))
                } else {
                    (non_empty(name), None)
                }
            }
        }
    }

    /// Parsed value for a flag.
    #[derive(Debug, Clone, PartialEq, Eq)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize), serde(untagged))]
    pub enum FlagValue {
        Bool(bool),
        Args(Vec<String>),
    }

    impl FlagValue {
        pub fn as_bool(&self) -> Option<bool> {
            match self {
                Self::Bool(b) => Some(*b),
                Self::Args(_) => None,
            }
        }

        pub fn as_args(&self) -> Option<&[String]> {
            match self {
                Self::Args(values) => Some(values.as_slice()),
                Self::Bool(_) => None,
            }
        }
    }

    /// Result of parsing one argument vector.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct ParsedArguments {
        error: Option<ParseError>,
        command_path: Vec<String>,
        flags: IndexMap<String, FlagValue>,
        positional_args: Vec<String>,
    }

    impl ParsedArguments {
        pub fn is_success(&self) -> bool {
            self.error.is_none()
        }

        pub fn error(&self) -> Option<&ParseError> {
            self.error.as_ref()
        }

        /// Human-readable failure message, set iff the parse failed.
        pub fn error_message(&self) -> Option<String> {
            self.error.as_ref().map(ToString::to_string)
        }

        /// Matched command names, root first. Empty in command-less mode.
        pub fn command_path(&self) -> &[String] {
            self.command_path.as_slice()
        }

        /// Flags keyed by canonical name, in order of first occurrence.
        pub fn flags(&self) -> &IndexMap<String, FlagValue> {
            &self.flags
        }

        pub fn positional_args(&self) -> &[String] {
            self.positional_args.as_slice()
        }

        pub fn get(&self, flag_name: &str) -> Option<&FlagValue> {
            self.flags.get(flag_name)
        }

        /// `false` when the flag is unset or was not a boolean flag.
        pub fn get_bool(&self, flag_name: &str) -> bool {
            self.get(flag_name)
                .and_then(FlagValue::as_bool)
                .unwrap_or(false)
        }

        /// Empty when the flag is unset or was not a multi-arg flag.
        pub fn get_args(&self, flag_name: &str) -> &[String] {
            self.get(flag_name)
                .and_then(FlagValue::as_args)
                .unwrap_or_default()
        }

        pub fn has_flag(&self, flag_name: &str) -> bool {
            self.flags.contains_key(flag_name)
        }
    }

    impl ParsedArguments {
        pub(crate) fn fail(&mut self, error: ParseError) {
            self.error = Some(error);
        }

        pub(crate) fn push_command(&mut self, name: String) {
            self.command_path.push(name);
        }

        pub(crate) fn set_flag(&mut self, name: &str, value: FlagValue) {
            self.flags.insert(name.to_string(), value);
        }

        pub(crate) fn push_positional(&mut self, value: String) {
            self.positional_args.push(value);
        }
    }

    #[cfg(feature = "serde")]
    impl serde::Serialize for ParsedArguments {
        fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            use serde::ser::SerializeStruct;

            let mut s = serializer.serialize_struct("ParsedArguments", 5)?;
            s.serialize_field("success", &self.is_success())?;
            s.serialize_field("error_message", &self.error_message())?;
            s.serialize_field("command_path", &self.command_path)?;
            s.serialize_field("flags", &self.flags)?;
            s.serialize_field("positional_args", &self.positional_args)?;
            s.end()
        }
    }
}

pub mod executor {
    use super::args::{FlagKind, FlagSpec, FlagValue, ParsedArguments};
    use super::error::ParseError;
    use indexmap::IndexMap;
    use std::fmt;

    /// Exit code for "parse failed" or "no dispatchable target".
    pub const FAILURE_CODE: i32 = -1;

    const HELP_FLAG: &str = "--help";

    /// Callback invoked with the parse result; returns the process exit code.
    pub type Handler = Box<dyn Fn(&ParsedArguments) -> i32>;

    /// A node in the command tree. Nodes without a handler only route to
    /// their children.
    pub struct CommandNode {
        name: String,
        description: String,
        handler: Option<Handler>,
        flags: Vec<FlagSpec>,
        children: IndexMap<String, CommandNode>,
    }

    impl CommandNode {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                description: String::new(),
                handler: None,
                flags: Vec::new(),
                children: IndexMap::new(),
            }
        }

        pub fn name(&self) -> &str {
            &self.name
        }

        pub fn description(&self) -> &str {
            &self.description
        }

        pub fn flags(&self) -> &[FlagSpec] {
            self.flags.as_slice()
        }

        pub fn children(&self) -> impl Iterator<Item = &CommandNode> {
            self.children.values()
        }

        pub fn has_handler(&self) -> bool {
            self.handler.is_some()
        }
    }

    impl fmt::Debug for CommandNode {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("CommandNode")
                .field("name", &self.name)
                .field("description", &self.description)
                .field("has_handler", &self.handler.is_some())
                .field("flags", &self.flags)
                .field("children", &self.children)
                .finish()
        }
    }

    /// Owns the command tree, the global flags and the optional command-less
    /// handler.
    pub struct Registry {
        program_name: String,
        description: String,
        usage: Option<String>,
        global_flags: Vec<FlagSpec>,
        commands: IndexMap<String, CommandNode>,
        default_handler: Option<Handler>,
    }

    impl fmt::Debug for Registry {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("Registry")
                .field("program_name", &self.program_name)
                .field("description", &self.description)
                .field("usage", &self.usage)
                .field("global_flags", &self.global_flags)
                .field("commands", &self.commands)
                .field("has_default_handler", &self.default_handler.is_some())
                .finish()
        }
    }

    fn split_path(path: &str) -> Vec<&str> {
        path.split('.').filter(|part| !part.is_empty()).collect()
    }

    impl Registry {
        /// Create a registry. `-h,--help` is registered as the first global flag.
        pub fn new(program_name: impl Into<String>, description: impl Into<String>) -> Self {
            let mut registry = Self {
                program_name: program_name.into(),
                description: description.into(),
                usage: None,
                global_flags: Vec::new(),
                commands: IndexMap::new(),
                default_handler: None,
            };
            registry.add_global_flag("-h,--help", FlagKind::Boolean, "Show help message", false);
            registry
        }

        pub fn program_name(&self) -> &str {
            &self.program_name
        }

        pub fn global_flags(&self) -> &[FlagSpec] {
            self.global_flags.as_slice()
        }

        pub fn commands(&self) -> impl Iterator<Item = &CommandNode> {
            self.commands.values()
        }

        /// Override the generated usage line of the top-level help.
        pub fn set_usage(&mut self, usage: impl Into<String>) {
            let usage = usage.into();
            self.usage = (!usage.trim().is_empty()).then_some(usage);
        }

        /// Install the handler used in command-less mode.
        pub fn set_handler(&mut self, handler: impl Fn(&ParsedArguments) -> i32 + 'static) {
            self.default_handler = Some(Box::new(handler));
        }

        pub fn add_global_flag(
            &mut self,
            names: &str,
            kind: FlagKind,
            description: &str,
            required: bool,
        ) {
            match FlagSpec::from_names(names, kind, description, required) {
                Some(spec) => self.global_flags.push(spec),
                None => tracing::warn!(names, "ignoring global flag without a name"),
            }
        }

        /// Register (or replace) a top-level command.
        pub fn add_command(
            &mut self,
            name: &str,
            description: &str,
            handler: impl Fn(&ParsedArguments) -> i32 + 'static,
        ) {
            let mut node = CommandNode::new(name);
            node.description = description.to_string();
            node.handler = Some(Box::new(handler));
            self.commands.insert(name.to_string(), node);
        }

        /// Register a command at a dotted path such as `"git.branch.list"`.
        ///
        /// Missing intermediate nodes are created as routers; existing ones are
        /// reused as-is.
        pub fn add_nested_command(
            &mut self,
            path: &str,
            description: &str,
            handler: impl Fn(&ParsedArguments) -> i32 + 'static,
        ) {
            let parts = split_path(path);
            let Some((first, rest)) = parts.split_first() else {
                tracing::warn!(path, "ignoring nested command with an empty path");
                return;
            };

            let mut node = self
                .commands
                .entry(first.to_string())
                .or_insert_with(|| CommandNode::new(first));
            for part in rest {
                node = node
                    .children
                    .entry(part.to_string())
                    .or_insert_with(|| CommandNode::new(part));
            }

            node.description = description.to_string();
            node.handler = Some(Box::new(handler));
        }

        /// Add a flag to a top-level command. No-op if the command is unknown.
        pub fn add_command_flag(
            &mut self,
            command_name: &str,
            names: &str,
            kind: FlagKind,
            description: &str,
            required: bool,
        ) {
            let Some(node) = self.commands.get_mut(command_name) else {
                tracing::warn!(command = command_name, names, "flag registered for unknown command");
                return;
            };
            push_flag(node, names, kind, description, required);
        }

        /// Add a flag to the command at a dotted path. No-op if the path is unknown.
        pub fn add_nested_command_flag(
            &mut self,
            path: &str,
            names: &str,
            kind: FlagKind,
            description: &str,
            required: bool,
        ) {
            let parts = split_path(path);
            let Some(node) = self.find_command_mut(&parts) else {
                tracing::warn!(command = path, names, "flag registered for unknown command");
                return;
            };
            push_flag(node, names, kind, description, required);
        }

        /// Resolve a command path to its node.
        pub fn find_command<S: AsRef<str>>(&self, path: &[S]) -> Option<&CommandNode> {
            let (first, rest) = path.split_first()?;
            let mut node = self.commands.get(first.as_ref())?;
            for part in rest {
                node = node.children.get(part.as_ref())?;
            }
            Some(node)
        }

        fn find_command_mut(&mut self, path: &[&str]) -> Option<&mut CommandNode> {
            let (first, rest) = path.split_first()?;
            let mut node = self.commands.get_mut(*first)?;
            for part in rest {
                node = node.children.get_mut(*part)?;
            }
            Some(node)
        }

        fn is_commandless(&self) -> bool {
            self.default_handler.is_some() && self.commands.is_empty()
        }
    }

    fn push_flag(node: &mut CommandNode, names: &str, kind: FlagKind, description: &str, required: bool) {
        match FlagSpec::from_names(names, kind, description, required) {
            Some(spec) => node.flags.push(spec),
            None => tracing::warn!(command = node.name.as_str(), names, "ignoring flag without a name"),
        }
    }

    /// Flags accumulated from every matched command level, root first.
    type Scope<'r> = Vec<&'r [FlagSpec]>;

    impl Registry {
        /// Parse `args` (program name excluded) against the registered schema.
        pub fn parse<I, S>(&self, args: I) -> ParsedArguments
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            let args: Vec<String> = args.into_iter().map(Into::into).collect();
            let mut parsed = ParsedArguments::default();
            if let Err(err) = self.parse_into(&args, &mut parsed) {
                tracing::debug!(error = %err, "argument parsing failed");
                parsed.fail(err);
            }
            parsed
        }

        /// Parse the current process arguments.
        pub fn parse_env(&self) -> ParsedArguments {
            self.parse(std::env::args().skip(1))
        }

        fn parse_into(&self, args: &[String], parsed: &mut ParsedArguments) -> Result<(), ParseError> {
            let commandless = self.is_commandless();
            if args.is_empty() {
                return if commandless {
                    Ok(())
                } else {
                    Err(ParseError::NoCommandSpecified)
                };
            }

            let mut scope: Scope<'_> = Vec::new();
            let mut i = 0usize;
            if !commandless && !args[0].starts_with('-') {
                i = self.resolve_command_path(args, parsed, &mut scope)?;
            }

            while i < args.len() {
                let arg = args[i].as_str();
                i += 1;

                if arg.starts_with("--") {
                    // --name, --name=value, --name=v1,v2
                    let (name, inline) = match arg.split_once('=') {
                        Some((name, value)) => (name, Some(value)),
                        None => (arg, None),
                    };
                    let spec = self.find_flag(name, &scope)?;
                    let value = match spec.kind {
                        FlagKind::Boolean => {
                            if inline.is_some() {
                                tracing::trace!(flag = name, "ignoring inline value for boolean flag");
                            }
                            FlagValue::Bool(true)
                        }
                        FlagKind::MultiArg => match inline {
                            Some(value) if !value.is_empty() => FlagValue::Args(
                                value
                                    .split(',')
                                    .filter(|item| !item.is_empty())
                                    .map(str::to_string)
                                    .collect(),
                            ),
                            _ => FlagValue::Args(take_values(args, &mut i)),
                        },
                    };
                    tracing::trace!(flag = spec.canonical_name(), ?value, "bound flag");
                    parsed.set_flag(spec.canonical_name(), value);
                } else if arg.starts_with('-') && arg.len() > 1 {
                    // Short flags never take the `=`/comma form.
                    let spec = self.find_flag(arg, &scope)?;
                    let value = match spec.kind {
                        FlagKind::Boolean => FlagValue::Bool(true),
                        FlagKind::MultiArg => FlagValue::Args(take_values(args, &mut i)),
                    };
                    tracing::trace!(flag = spec.canonical_name(), ?value, "bound flag");
                    parsed.set_flag(spec.canonical_name(), value);
                } else {
                    parsed.push_positional(arg.to_string());
                }
            }

            self.check_required(&scope, parsed)
        }

        /// Consume the leading command tokens and return how many were used.
        fn resolve_command_path<'r>(
            &'r self,
            args: &[String],
            parsed: &mut ParsedArguments,
            scope: &mut Scope<'r>,
        ) -> Result<usize, ParseError> {
            let first = &args[0];
            let Some(mut node) = self.commands.get(first.as_str()) else {
                if self.commands.is_empty() {
                    return Ok(0);
                }
                return Err(ParseError::UnknownCommand(first.clone()));
            };
            parsed.push_command(first.clone());
            scope.push(node.flags.as_slice());

            let mut consumed = 1usize;
            for token in &args[1..] {
                if token.starts_with('-') {
                    break;
                }
                // Unmatched deeper tokens fall through as positionals.
                let Some(child) = node.children.get(token.as_str()) else {
                    break;
                };
                node = child;
                parsed.push_command(token.clone());
                scope.push(node.flags.as_slice());
                consumed += 1;
            }

            tracing::debug!(path = ?parsed.command_path(), "resolved command path");
            Ok(consumed)
        }

        /// Deepest command level first, then globals.
        fn find_flag<'r>(&'r self, name: &str, scope: &Scope<'r>) -> Result<&'r FlagSpec, ParseError> {
            scope
                .iter()
                .rev()
                .flat_map(|level| level.iter())
                .chain(self.global_flags.iter())
                .find(|spec| spec.matches(name))
                .ok_or_else(|| ParseError::UnknownFlag(name.to_string()))
        }

        /// Globals are checked before command flags; the first missing one wins.
        fn check_required(&self, scope: &Scope<'_>, parsed: &ParsedArguments) -> Result<(), ParseError> {
            match self
                .global_flags
                .iter()
                .chain(scope.iter().flat_map(|level| level.iter()))
                .filter(|spec| spec.required)
                .find(|spec| !parsed.has_flag(spec.canonical_name()))
            {
                Some(spec) => Err(ParseError::MissingRequiredFlag(
                    spec.canonical_name().to_string(),
                )),
                None => Ok(()),
            }
        }
    }

    fn take_values(args: &[String], i: &mut usize) -> Vec<String> {
        let mut values = Vec::new();
        while let Some(arg) = args.get(*i) {
            if arg.starts_with('-') {
                break;
            }
            values.push(arg.clone());
            *i += 1;
        }
        values
    }

    impl Registry {
        /// Dispatch a parse result.
        ///
        /// Returns [`FAILURE_CODE`] for failed parses and when there is nothing
        /// to dispatch to. `--help` and router nodes print help and return 0.
        pub fn execute(&self, parsed: &ParsedArguments) -> i32 {
            if !parsed.is_success() {
                return FAILURE_CODE;
            }

            if parsed.get_bool(HELP_FLAG) {
                if parsed.command_path().is_empty() {
                    print!("{}", self.help());
                } else {
                    print!("{}", self.help_for(parsed.command_path()));
                }
                return 0;
            }

            if parsed.command_path().is_empty() {
                return match &self.default_handler {
                    Some(handler) => handler(parsed),
                    None => FAILURE_CODE,
                };
            }

            match self.find_command(parsed.command_path()) {
                Some(CommandNode {
                    handler: Some(handler),
                    ..
                }) => {
                    tracing::debug!(path = ?parsed.command_path(), "dispatching command");
                    handler(parsed)
                }
                _ => {
                    print!("{}", self.help_for(parsed.command_path()));
                    0
                }
            }
        }

        /// Parse and execute. Parse errors are reported on stderr.
        pub fn run<I, S>(&self, args: I) -> i32
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            let parsed = self.parse(args);
            if let Some(err) = parsed.error() {
                eprintln!("Error: {err}");
                eprintln!("Use --help for usage information.");
                return FAILURE_CODE;
            }
            self.execute(&parsed)
        }

        /// [`Registry::run`] over the current process arguments.
        pub fn run_env(&self) -> i32 {
            self.run(std::env::args().skip(1))
        }
    }

    fn format_entry(name: &str, description: &str) -> String {
        if description.is_empty() {
            format!("  {name}\n")
        } else {
            format!("  {name}\t{description}\n")
        }
    }

    fn format_flag(spec: &FlagSpec) -> String {
        let names: Vec<&str> = [spec.short_name.as_deref(), spec.long_name.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        let mut out = format!("  {}", names.join(", "));
        if spec.kind == FlagKind::MultiArg {
            out.push_str(" <args>");
        }
        if !spec.description.is_empty() {
            out.push('\t');
            out.push_str(&spec.description);
        }
        if spec.required {
            out.push_str(" (required)");
        }
        out.push('\n');
        out
    }

    impl Registry {
        /// Render the top-level help.
        pub fn help(&self) -> String {
            let mut out = String::new();
            if self.description.is_empty() {
                out.push_str(&format!("{}\n\n", self.program_name));
            } else {
                out.push_str(&format!("{} - {}\n\n", self.program_name, self.description));
            }

            let usage = match &self.usage {
                Some(usage) => usage.as_str(),
                None if self.commands.is_empty() => "[options] [args...]",
                None => "<command> [options]",
            };
            out.push_str(&format!("Usage: {} {}\n\n", self.program_name, usage));

            if !self.commands.is_empty() {
                out.push_str("Commands:\n");
                for node in self.commands.values() {
                    out.push_str(&format_entry(&node.name, &node.description));
                }
                out.push('\n');
            }

            if !self.global_flags.is_empty() {
                out.push_str("Options:\n");
                for spec in &self.global_flags {
                    out.push_str(&format_flag(spec));
                }
            }

            out
        }

        /// Render help for a command path (leaf or router node).
        pub fn help_for<S: AsRef<str>>(&self, path: &[S]) -> String {
            let joined = path.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(" ");
            let Some(node) = self.find_command(path) else {
                return format!("Unknown command: {joined}\n");
            };

            let invocation = format!("{} {}", self.program_name, joined);
            let mut out = String::new();
            if node.description.is_empty() {
                out.push_str(&format!("{invocation}\n\n"));
            } else {
                out.push_str(&format!("{invocation} - {}\n\n", node.description));
            }

            out.push_str(&format!("Usage: {invocation}"));
            if !node.children.is_empty() {
                out.push_str(" <subcommand>");
            }
            out.push_str(" [options]\n\n");

            if !node.children.is_empty() {
                out.push_str("Subcommands:\n");
                for child in node.children.values() {
                    out.push_str(&format_entry(&child.name, &child.description));
                }
                out.push('\n');
            }

            if !node.flags.is_empty() {
                out.push_str("Command Options:\n");
                for spec in &node.flags {
                    out.push_str(&format_flag(spec));
                }
                out.push('\n');
            }

            if !self.global_flags.is_empty() {
                out.push_str("Global Options:\n");
                for spec in &self.global_flags {
                    out.push_str(&format_flag(spec));
                }
            }

            out
        }
    }
}

pub use args::{FlagKind, FlagSpec, FlagValue, ParsedArguments};
pub use error::ParseError;
pub use executor::{CommandNode, FAILURE_CODE, Handler, Registry};

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn registry() -> Registry {
        Registry::new("test_program", "A test program")
    }

    fn ok(_: &ParsedArguments) -> i32 {
        0
    }

    #[test]
    fn flag_names_split_in_either_order() {
        let spec = FlagSpec::from_names("--verbose , -v", FlagKind::Boolean, "", false).unwrap();
        assert_eq!(spec.short_name.as_deref(), Some("-v"));
        assert_eq!(spec.long_name.as_deref(), Some("--verbose"));
        assert_eq!(spec.canonical_name(), "--verbose");

        let spec = FlagSpec::from_names("-d", FlagKind::Boolean, "", false).unwrap();
        assert_eq!(spec.long_name, None);
        assert_eq!(spec.canonical_name(), "-d");

        assert!(FlagSpec::from_names("", FlagKind::Boolean, "", false).is_none());
    }

    #[test]
    fn short_and_long_share_canonical_entry() {
        let mut r = registry();
        r.add_global_flag("-v,--verbose", FlagKind::Boolean, "Verbose output", false);
        r.add_command("cmd", "Test command", ok);

        let short = r.parse(["cmd", "-v"]);
        let long = r.parse(["cmd", "--verbose"]);
        assert!(short.is_success());
        assert!(short.get_bool("--verbose"));
        assert_eq!(short, long);
    }

    #[test]
    fn short_only_flag_is_keyed_by_short_name() {
        let mut r = registry();
        r.add_global_flag("-d", FlagKind::Boolean, "Debug mode", false);
        r.add_command("cmd", "Test command", ok);

        let parsed = r.parse(["cmd", "-d"]);
        assert!(parsed.get_bool("-d"));
    }

    #[test]
    fn multi_arg_comma_and_space_forms_agree() {
        let mut r = registry();
        r.add_global_flag("-f,--files", FlagKind::MultiArg, "Input files", false);
        r.add_command("process", "Process files", ok);

        let comma = r.parse(["process", "--files=a,b,c"]);
        let space = r.parse(["process", "--files", "a", "b", "c"]);
        let short = r.parse(["process", "-f", "a", "b", "c"]);
        assert_eq!(comma.get_args("--files"), ["a", "b", "c"]);
        assert_eq!(comma, space);
        assert_eq!(space, short);
    }

    #[test]
    fn inline_value_skips_empty_segments() {
        let mut r = registry();
        r.add_global_flag("--files", FlagKind::MultiArg, "", false);
        r.add_command("cmd", "", ok);

        let parsed = r.parse(["cmd", "--files=a,,b,"]);
        assert_eq!(parsed.get_args("--files"), ["a", "b"]);
    }

    #[test]
    fn multi_arg_may_capture_nothing() {
        let mut r = registry();
        r.add_global_flag("-f,--files", FlagKind::MultiArg, "", false);
        r.add_global_flag("-v,--verbose", FlagKind::Boolean, "", false);
        r.add_command("cmd", "", ok);

        let parsed = r.parse(["cmd", "-f", "-v"]);
        assert!(parsed.is_success());
        assert!(parsed.has_flag("--files"));
        assert!(parsed.get_args("--files").is_empty());
        assert!(parsed.get_bool("--verbose"));
    }

    #[test]
    fn multi_arg_swallows_following_positionals() {
        let mut r = registry();
        r.add_global_flag("-o,--output", FlagKind::MultiArg, "", false);
        r.add_command("cmd", "", ok);

        let parsed = r.parse(["cmd", "-o", "out.txt", "in.txt"]);
        assert_eq!(parsed.get_args("--output"), ["out.txt", "in.txt"]);
        assert!(parsed.positional_args().is_empty());

        let parsed = r.parse(["cmd", "--output=out.txt", "in.txt"]);
        assert_eq!(parsed.get_args("--output"), ["out.txt"]);
        assert_eq!(parsed.positional_args(), ["in.txt"]);
    }

    #[test]
    fn boolean_long_flag_ignores_inline_value() {
        let mut r = registry();
        r.add_global_flag("--debug", FlagKind::Boolean, "", false);
        r.add_command("cmd", "", ok);

        let parsed = r.parse(["cmd", "--debug=no"]);
        assert!(parsed.is_success());
        assert!(parsed.get_bool("--debug"));
    }

    #[test]
    fn accessors_return_defaults_on_kind_mismatch() {
        let mut r = registry();
        r.add_global_flag("-v,--verbose", FlagKind::Boolean, "", false);
        r.add_global_flag("-f,--files", FlagKind::MultiArg, "", false);
        r.add_command("cmd", "", ok);

        let parsed = r.parse(["cmd", "-v", "-f", "a"]);
        assert!(parsed.get_args("--verbose").is_empty());
        assert!(!parsed.get_bool("--files"));
        assert!(!parsed.get_bool("--missing"));
        assert!(parsed.has_flag("--files"));
        assert!(!parsed.has_flag("--missing"));
    }

    #[test]
    fn scenario_verbose_and_files() {
        let mut r = registry();
        r.add_global_flag("-v,--verbose", FlagKind::Boolean, "", false);
        r.add_global_flag("-f,--files", FlagKind::MultiArg, "", false);
        r.add_command("cmd", "", ok);

        let parsed = r.parse(["cmd", "-v", "-f", "a.txt", "b.txt"]);
        assert!(parsed.get_bool("--verbose"));
        assert_eq!(parsed.get_args("--files"), ["a.txt", "b.txt"]);
        assert_eq!(parsed.command_path(), ["cmd"]);
    }

    #[test]
    fn flags_keep_first_occurrence_order() {
        let mut r = registry();
        r.add_global_flag("-a,--alpha", FlagKind::MultiArg, "", false);
        r.add_global_flag("-b,--beta", FlagKind::Boolean, "", false);
        r.add_command("cmd", "", ok);

        let parsed = r.parse(["cmd", "--alpha=1", "-b", "-a", "2"]);
        let keys: Vec<&str> = parsed.flags().keys().map(String::as_str).collect();
        assert_eq!(keys, ["--alpha", "--beta"]);
        assert_eq!(parsed.get_args("--alpha"), ["2"]);
    }

    #[test]
    fn unknown_flag_fails() {
        let mut r = registry();
        r.add_command("cmd", "", ok);

        let parsed = r.parse(["cmd", "--unknown"]);
        assert!(!parsed.is_success());
        assert!(parsed.error_message().unwrap().contains("Unknown flag: --unknown"));

        let parsed = r.parse(["cmd", "--unknown=3"]);
        assert_eq!(parsed.error(), Some(&ParseError::UnknownFlag("--unknown".into())));
    }

    #[test]
    fn unknown_command_fails() {
        let mut r = registry();
        r.add_command("cmd", "", ok);

        let parsed = r.parse(["nope"]);
        assert_eq!(parsed.error_message().as_deref(), Some("Unknown command: nope"));
    }

    #[test]
    fn empty_input_requires_a_command() {
        let mut r = registry();
        r.add_command("cmd", "", ok);

        let parsed = r.parse(Vec::<String>::new());
        assert!(!parsed.is_success());
        assert_eq!(parsed.error_message().as_deref(), Some("No command specified"));
        assert_eq!(r.execute(&parsed), FAILURE_CODE);
    }

    #[test]
    fn command_specific_flag_only_in_its_command() {
        let mut r = registry();
        r.add_command("build", "", ok);
        r.add_command("clean", "", ok);
        r.add_command_flag("build", "-r,--release", FlagKind::Boolean, "Release build", false);

        assert!(r.parse(["build", "-r"]).get_bool("--release"));
        assert_eq!(
            r.parse(["clean", "--release"]).error(),
            Some(&ParseError::UnknownFlag("--release".into()))
        );
    }

    #[test]
    fn flag_for_unknown_command_is_ignored() {
        let mut r = registry();
        r.add_command("cmd", "", ok);
        r.add_command_flag("missing", "--x", FlagKind::Boolean, "", true);
        r.add_nested_command_flag("cmd.sub", "--y", FlagKind::Boolean, "", true);

        assert!(r.parse(["cmd"]).is_success());
    }

    #[test]
    fn missing_required_flag_reports_globals_first() {
        let mut r = registry();
        r.add_global_flag("-c,--config", FlagKind::MultiArg, "", true);
        r.add_command("copy", "", ok);
        r.add_command_flag("copy", "-s,--source", FlagKind::MultiArg, "", true);
        r.add_command_flag("copy", "-d,--dest", FlagKind::MultiArg, "", true);

        let parsed = r.parse(["copy"]);
        assert_eq!(parsed.error_message().as_deref(), Some("Missing required flag: --config"));

        let parsed = r.parse(["copy", "--config=c", "--dest=x"]);
        assert_eq!(parsed.error_message().as_deref(), Some("Missing required flag: --source"));

        let parsed = r.parse(["copy", "--config=c", "-s", "a", "-d", "b"]);
        assert!(parsed.is_success());
    }

    #[test]
    fn positional_args_interleave_with_flags() {
        let mut r = registry();
        r.add_global_flag("-v,--verbose", FlagKind::Boolean, "", false);
        r.add_command("cmd", "", ok);

        let parsed = r.parse(["cmd", "one", "-v", "two", "-"]);
        assert_eq!(parsed.positional_args(), ["one", "two", "-"]);
        assert!(parsed.get_bool("--verbose"));
    }

    #[test]
    fn parsing_is_idempotent() {
        let mut r = registry();
        r.add_global_flag("-f,--files", FlagKind::MultiArg, "", false);
        r.add_nested_command("a.b", "", ok);

        let argv = ["a", "b", "x", "--files=1,2", "-h"];
        assert_eq!(r.parse(argv), r.parse(argv));
    }

    #[test]
    fn nested_command_dispatches_to_leaf() {
        let mut r = registry();
        r.add_nested_command("git.branch.list", "List branches", |_| 1);
        r.add_nested_command("git.branch.create", "Create branch", |_| 2);
        r.add_nested_command("git.branch.delete", "Delete branch", |_| 3);

        let parsed = r.parse(["git", "branch", "list"]);
        assert_eq!(parsed.command_path(), ["git", "branch", "list"]);
        assert_eq!(r.execute(&parsed), 1);
        assert_eq!(r.execute(&r.parse(["git", "branch", "create"])), 2);
        assert_eq!(r.execute(&r.parse(["git", "branch", "delete"])), 3);
    }

    #[test]
    fn nested_command_four_levels() {
        let mut r = registry();
        r.add_nested_command("a.b.c.d", "deep", |_| 7);

        let parsed = r.parse(["a", "b", "c", "d"]);
        assert_eq!(parsed.command_path().len(), 4);
        assert_eq!(r.execute(&parsed), 7);
    }

    #[test]
    fn nested_registration_reuses_intermediate_nodes() {
        let mut r = registry();
        r.add_nested_command("tool", "The tool", |_| 4);
        r.add_nested_command("tool.sub", "Sub", |_| 5);

        let tool = r.find_command(&["tool"]).unwrap();
        assert_eq!(tool.description(), "The tool");
        assert!(tool.has_handler());
        assert_eq!(r.execute(&r.parse(["tool"])), 4);
        assert_eq!(r.execute(&r.parse(["tool", "sub"])), 5);
    }

    #[test]
    fn unmatched_deeper_token_becomes_positional() {
        let mut r = registry();
        r.add_nested_command("docker.container.ls", "List containers", ok);

        let parsed = r.parse(["docker", "container", "unknown"]);
        assert!(parsed.is_success());
        assert_eq!(parsed.command_path(), ["docker", "container"]);
        assert_eq!(parsed.positional_args(), ["unknown"]);
    }

    #[test]
    fn router_node_falls_back_to_help() {
        let called = Rc::new(Cell::new(false));
        let flag = Rc::clone(&called);

        let mut r = registry();
        r.add_nested_command("parent.child.leaf", "Leaf command", move |_| {
            flag.set(true);
            99
        });

        let parsed = r.parse(["parent", "child"]);
        assert!(parsed.is_success());
        assert_eq!(r.execute(&parsed), 0);
        assert!(!called.get());
    }

    #[test]
    fn nested_flags_accumulate_along_path() {
        let mut r = registry();
        r.add_nested_command("cloud.storage.upload", "Upload", |args| {
            args.get_args("--file").len() as i32
        });
        r.add_nested_command_flag("cloud", "-r,--region", FlagKind::MultiArg, "", false);
        r.add_nested_command_flag("cloud.storage.upload", "-f,--file", FlagKind::MultiArg, "", false);

        let parsed = r.parse(["cloud", "storage", "upload", "-r", "eu", "-f", "a", "b"]);
        assert!(parsed.is_success());
        assert_eq!(parsed.get_args("--region"), ["eu"]);
        assert_eq!(r.execute(&parsed), 2);

        // Leaf flags are not visible one level up.
        let parsed = r.parse(["cloud", "storage", "-f", "a"]);
        assert_eq!(parsed.error(), Some(&ParseError::UnknownFlag("-f".into())));
    }

    #[test]
    fn deepest_level_wins_on_name_collision() {
        let mut r = registry();
        r.add_nested_command("outer.inner", "", ok);
        r.add_nested_command_flag("outer", "-x,--outer-x", FlagKind::Boolean, "", false);
        r.add_nested_command_flag("outer.inner", "-x,--inner-x", FlagKind::Boolean, "", false);

        let parsed = r.parse(["outer", "inner", "-x"]);
        assert!(parsed.get_bool("--inner-x"));
        assert!(!parsed.has_flag("--outer-x"));
    }

    #[test]
    fn nested_mixed_flags_and_args() {
        let mut r = registry();
        r.add_nested_command("tool.sub.action", "Perform action", ok);
        r.add_global_flag("-v,--verbose", FlagKind::Boolean, "Global verbose", false);
        r.add_nested_command_flag("tool.sub.action", "-o,--output", FlagKind::MultiArg, "Output file", false);

        let parsed = r.parse(["tool", "sub", "action", "-v", "--output=out.txt", "arg1", "arg2"]);
        assert!(parsed.is_success());
        assert!(parsed.get_bool("--verbose"));
        assert_eq!(parsed.get_args("--output"), ["out.txt"]);
        assert_eq!(parsed.positional_args(), ["arg1", "arg2"]);
    }

    #[test]
    fn handler_receives_parse_result() {
        let mut r = registry();
        r.add_command("count", "", |args| args.positional_args().len() as i32);

        assert_eq!(r.run(["count", "a", "b", "c"]), 3);
    }

    #[test]
    fn help_flag_short_circuits_handler() {
        let called = Rc::new(Cell::new(false));
        let flag = Rc::clone(&called);

        let mut r = registry();
        r.add_command("cmd", "", move |_| {
            flag.set(true);
            42
        });

        let parsed = r.parse(["cmd", "--help"]);
        assert!(parsed.get_bool("--help"));
        assert_eq!(r.execute(&parsed), 0);
        assert_eq!(r.execute(&r.parse(["-h"])), 0);
        assert!(!called.get());
    }

    #[test]
    fn leading_flag_without_default_handler_has_no_target() {
        let mut r = registry();
        r.add_global_flag("-v,--verbose", FlagKind::Boolean, "", false);
        r.add_command("cmd", "", ok);

        let parsed = r.parse(["-v"]);
        assert!(parsed.is_success());
        assert!(parsed.command_path().is_empty());
        assert_eq!(r.execute(&parsed), FAILURE_CODE);
    }

    #[test]
    fn commandless_mode_treats_everything_as_positional() {
        let seen = Rc::new(Cell::new(0usize));
        let count = Rc::clone(&seen);

        let mut r = Registry::new("cat", "");
        r.add_global_flag("-n,--number", FlagKind::Boolean, "", false);
        r.set_handler(move |args| {
            count.set(args.positional_args().len());
            0
        });

        let parsed = r.parse(["a.txt", "-n", "b.txt"]);
        assert!(parsed.is_success());
        assert!(parsed.command_path().is_empty());
        assert_eq!(parsed.positional_args(), ["a.txt", "b.txt"]);
        assert_eq!(r.execute(&parsed), 0);
        assert_eq!(seen.get(), 2);

        let empty = r.parse(Vec::<String>::new());
        assert!(empty.is_success());
        assert_eq!(r.execute(&empty), 0);
    }

    #[test]
    fn run_reports_parse_failure() {
        let mut r = registry();
        r.add_command("cmd", "", ok);
        assert_eq!(r.run(["cmd", "--bogus"]), FAILURE_CODE);
    }

    #[test]
    fn top_level_help_lists_commands_and_options() {
        let mut r = registry();
        r.add_global_flag("-v,--verbose", FlagKind::Boolean, "Verbose output", false);
        r.add_global_flag("-c,--config", FlagKind::MultiArg, "Config files", true);
        r.add_command("build", "Build things", ok);

        let text = r.help();
        assert!(text.starts_with("test_program - A test program\n\n"));
        assert!(text.contains("Usage: test_program <command> [options]\n"));
        assert!(text.contains("Commands:\n  build\tBuild things\n"));
        assert!(text.contains("Options:\n  -h, --help\tShow help message\n"));
        assert!(text.contains("  -v, --verbose\tVerbose output\n"));
        assert!(text.contains("  -c, --config <args>\tConfig files (required)\n"));
    }

    #[test]
    fn top_level_help_usage_variants() {
        let mut commandless = Registry::new("tail", "");
        commandless.set_handler(ok);
        assert!(commandless.help().contains("Usage: tail [options] [args...]\n"));
        assert!(!commandless.help().contains("Commands:"));

        commandless.set_usage("<source> <dest>");
        assert!(commandless.help().contains("Usage: tail <source> <dest>\n"));

        commandless.set_usage("  ");
        assert!(commandless.help().contains("Usage: tail [options] [args...]\n"));

        let mut with_commands = registry();
        with_commands.add_command("cmd", "", ok);
        with_commands.set_usage("");
        assert!(with_commands.help().contains("Usage: test_program <command> [options]\n"));
    }

    #[test]
    fn add_command_replaces_existing_subtree() {
        let mut r = registry();
        r.add_nested_command("a.b", "child", |_| 1);
        r.add_command("a", "replacement", |_| 9);

        let a = r.find_command(&["a"]).unwrap();
        assert_eq!(a.children().count(), 0);
        assert_eq!(a.description(), "replacement");

        let parsed = r.parse(["a", "b"]);
        assert!(parsed.is_success());
        assert_eq!(parsed.command_path(), ["a"]);
        assert_eq!(parsed.positional_args(), ["b"]);
        assert_eq!(r.execute(&parsed), 9);
    }

    #[test]
    fn stray_token_without_commands_or_handler_is_positional() {
        let r = registry();

        let parsed = r.parse(["x", "-h"]);
        assert!(parsed.is_success());
        assert!(parsed.command_path().is_empty());
        assert_eq!(parsed.positional_args(), ["x"]);
        assert!(parsed.get_bool("--help"));
    }

    #[test]
    fn registry_exposes_command_tree() {
        let mut r = registry();
        r.add_global_flag("-v,--verbose", FlagKind::Boolean, "", false);
        r.add_nested_command("db.migrate", "Run migrations", ok);
        r.add_nested_command("db.seed", "Seed data", ok);
        r.add_nested_command_flag("db.migrate", "--dry-run", FlagKind::Boolean, "", false);

        assert_eq!(r.program_name(), "test_program");
        let globals: Vec<&str> = r.global_flags().iter().map(FlagSpec::canonical_name).collect();
        assert_eq!(globals, ["--help", "--verbose"]);

        let top: Vec<&str> = r.commands().map(CommandNode::name).collect();
        assert_eq!(top, ["db"]);

        let db = r.find_command(&["db"]).unwrap();
        assert!(!db.has_handler());
        assert!(db.flags().is_empty());
        let children: Vec<&str> = db.children().map(CommandNode::name).collect();
        assert_eq!(children, ["migrate", "seed"]);

        let migrate = r.find_command(&["db", "migrate"]).unwrap();
        assert_eq!(migrate.flags()[0].canonical_name(), "--dry-run");
    }

    #[test]
    fn command_help_shows_subcommands_and_options() {
        let mut r = registry();
        r.add_nested_command("kubectl.get.pods", "Get pods", ok);
        r.add_nested_command("kubectl.get.services", "Get services", ok);
        r.add_nested_command_flag("kubectl.get.pods", "-n,--namespace", FlagKind::MultiArg, "Kubernetes namespace", false);

        let mid = r.help_for(&["kubectl", "get"]);
        assert!(mid.starts_with("test_program kubectl get\n\n"));
        assert!(mid.contains("Usage: test_program kubectl get <subcommand> [options]\n"));
        assert!(mid.contains("Subcommands:\n  pods\tGet pods\n  services\tGet services\n"));
        assert!(mid.contains("Global Options:\n"));

        let leaf = r.help_for(&["kubectl", "get", "pods"]);
        assert!(leaf.starts_with("test_program kubectl get pods - Get pods\n\n"));
        assert!(leaf.contains("Usage: test_program kubectl get pods [options]\n"));
        assert!(leaf.contains("Command Options:\n  -n, --namespace <args>\tKubernetes namespace\n"));
        assert!(!leaf.contains("Subcommands:"));
    }

    #[test]
    fn command_help_for_unknown_path() {
        let r = registry();
        assert_eq!(r.help_for(&["nope", "deeper"]), "Unknown command: nope deeper\n");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn parse_result_serializes_to_json() {
        let mut r = registry();
        r.add_global_flag("-f,--files", FlagKind::MultiArg, "", false);
        r.add_command("cmd", "", ok);

        let parsed = r.parse(["cmd", "-f", "a", "b"]);
        let json = serde_json::to_value(&parsed).unwrap();
        assert_eq!(json["success"], serde_json::json!(true));
        assert_eq!(json["command_path"], serde_json::json!(["cmd"]));
        assert_eq!(json["flags"]["--files"], serde_json::json!(["a", "b"]));
    }
}
