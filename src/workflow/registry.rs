//! Command registry: named commands with typed parameter specs, default
//! merging, and ordered before/after callback chains.
//!
//! Commands live in an explicit table owned by whoever built the registry;
//! there is no global instance. Overrides swap a command's body while its
//! parameter spec and any registered callbacks stay put.

use crate::session::Session;
use anyhow::{bail, Result};
use std::collections::BTreeMap;
use std::rc::Rc;

/// A parameter value: either text or a switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(String),
    Bool(bool),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Value::Str(s) => s,
            Value::Bool(true) => "true",
            Value::Bool(false) => "false",
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Str(s) => s.trim() == "true",
        }
    }

    /// Blank text counts as "not supplied"; switches are never blank.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Str(s) => s.trim().is_empty(),
            Value::Bool(_) => false,
        }
    }
}

/// Working parameter set handed to callbacks and command bodies.
pub type ParamMap = BTreeMap<String, Value>;

pub type CommandBody = Rc<dyn Fn(&Session, &ParamMap) -> Result<()>>;
pub type Callback = Rc<dyn Fn(&ParamMap) -> Option<ParamMap>>;

/// Declared parameters for one command: ordered positional arguments,
/// named flags, and boolean switches, each with a default.
#[derive(Default, Clone)]
pub struct ParamSpec {
    pub arguments: Vec<(String, Value)>,
    pub flags: Vec<(String, Value)>,
    pub switches: Vec<(String, bool)>,
}

impl ParamSpec {
    pub fn argument(mut self, name: &str, default: &str) -> Self {
        self.arguments.push((normalize(name), Value::str(default)));
        self
    }

    pub fn flag(mut self, name: &str, default: &str) -> Self {
        self.flags.push((normalize(name), Value::str(default)));
        self
    }

    pub fn switch(mut self, name: &str, default: bool) -> Self {
        self.switches.push((normalize(name), default));
        self
    }

    /// All declared defaults in one map.
    pub fn defaults(&self) -> ParamMap {
        let mut map = ParamMap::new();
        for (name, default) in &self.arguments {
            map.insert(name.clone(), default.clone());
        }
        for (name, default) in &self.flags {
            map.insert(name.clone(), default.clone());
        }
        for (name, default) in &self.switches {
            map.insert(name.clone(), Value::Bool(*default));
        }
        map
    }
}

/// Help text for one command, kept separate from the executable spec.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandDocs {
    pub summary: String,
    pub arguments: Vec<(String, String)>,
    pub flags: Vec<(String, String)>,
    pub switches: Vec<(String, String)>,
    pub description: String,
}

struct Command {
    spec: ParamSpec,
    body: CommandBody,
}

/// Flag and switch names are hyphen-case everywhere so CLI parsing and
/// internal lookup agree.
pub fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace('_', "-")
}

#[derive(Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, Command>,
    before: BTreeMap<String, Vec<Callback>>,
    after: BTreeMap<String, Vec<Callback>>,
    docs: BTreeMap<String, CommandDocs>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command. Re-registering a name replaces the body and
    /// spec wholesale; callbacks registered against the name survive.
    pub fn define<F>(&mut self, name: &str, spec: ParamSpec, body: F)
    where
        F: Fn(&Session, &ParamMap) -> Result<()> + 'static,
    {
        self.commands.insert(
            normalize(name),
            Command {
                spec,
                body: Rc::new(body),
            },
        );
    }

    /// Replace a command's body with a wrapper that receives the previous
    /// body. The parameter spec and callback chains are untouched.
    /// Unknown names are a configuration error: logged and ignored.
    pub fn override_command<F>(&mut self, name: &str, wrap: F)
    where
        F: FnOnce(CommandBody) -> CommandBody,
    {
        let name = normalize(name);
        match self.commands.get_mut(&name) {
            Some(command) => command.body = wrap(command.body.clone()),
            None => {
                tracing::warn!("cannot override unknown command {name:?}; ignoring");
            }
        }
    }

    /// Register a callback to run before the command body. Unknown names
    /// are logged and the callback dropped; workflow files may load in any
    /// order, so this must not be fatal.
    pub fn before<F>(&mut self, name: &str, callback: F)
    where
        F: Fn(&ParamMap) -> Option<ParamMap> + 'static,
    {
        let name = normalize(name);
        if !self.commands.contains_key(&name) {
            tracing::warn!("before-callback registered for unknown command {name:?}; dropping");
            return;
        }
        self.before.entry(name).or_default().push(Rc::new(callback));
    }

    /// Register a callback to run after the command body. Its return value
    /// is discarded. Unknown names are logged and dropped.
    pub fn after<F>(&mut self, name: &str, callback: F)
    where
        F: Fn(&ParamMap) -> Option<ParamMap> + 'static,
    {
        let name = normalize(name);
        if !self.commands.contains_key(&name) {
            tracing::warn!("after-callback registered for unknown command {name:?}; dropping");
            return;
        }
        self.after.entry(name).or_default().push(Rc::new(callback));
    }

    /// Store help text for a command, keyed like the executable entry.
    pub fn document(&mut self, name: &str, docs: CommandDocs) {
        self.docs.insert(normalize(name), docs);
    }

    pub fn docs(&self, name: &str) -> Option<&CommandDocs> {
        self.docs.get(&normalize(name))
    }

    pub fn has_command(&self, name: &str) -> bool {
        self.commands.contains_key(&normalize(name))
    }

    pub fn command_names(&self) -> Vec<&str> {
        self.commands.keys().map(String::as_str).collect()
    }

    /// Invoke a command: fill defaults over the supplied parameters, run
    /// the before chain (each callback may merge overrides into the
    /// working map), run the body, then the after chain.
    pub fn run(&self, name: &str, supplied: ParamMap, session: &Session) -> Result<()> {
        let name = normalize(name);
        let Some(command) = self.commands.get(&name) else {
            bail!("unknown command: {name}");
        };
        let defaults = command.spec.defaults();

        let mut params = ParamMap::new();
        for (key, value) in supplied {
            let key = normalize(&key);
            // A blank supplied value is the same as not supplying it.
            if value.is_blank() {
                if let Some(default) = defaults.get(&key) {
                    params.insert(key, default.clone());
                    continue;
                }
            }
            params.insert(key, value);
        }
        for (key, default) in defaults {
            params.entry(key).or_insert(default);
        }

        if let Some(chain) = self.before.get(&name) {
            for callback in chain {
                if let Some(overrides) = callback(&params) {
                    for (key, value) in overrides {
                        params.insert(normalize(&key), value);
                    }
                }
            }
        }

        (command.body)(session, &params)?;

        if let Some(chain) = self.after.get(&name) {
            for callback in chain {
                callback(&params);
            }
        }
        Ok(())
    }

    /// Drop every command, doc, and callback chain.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.before.clear();
        self.after.clear();
        self.docs.clear();
    }
}
