//! The script engine: a Rhai interpreter whose only I/O is the mediator.
//!
//! A fresh [`Engine`] is built for every evaluation. It has no module
//! resolver, no `eval`, and no registered functions beyond the read helpers
//! below and the write/process entry points that always fail.

use std::cell::RefCell;
use std::rc::Rc;

use rhai::module_resolvers::DummyModuleResolver;
use regex::Regex;
use rhai::{
    Array, Dynamic, Engine, EvalAltResult, ImmutableString, Map, Module, ParseErrorType, Position,
    INT,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::mediator::{AccessMediator, MediatorError, ReadView};
use crate::outcome::{ExecutionResult, Violation};

type RhaiResultOf<T> = Result<T, Box<EvalAltResult>>;

/// Marker appended when captured output hits its cap.
pub const TRUNCATION_MARKER: &str = "\n[Output truncated]\n";

/// Global functions that always raise a write violation.
const DENIED_GLOBALS: &[&str] = &[
    "write_file",
    "delete_file",
    "remove_file",
    "rename_file",
    "mkdir",
    "rmdir",
    "system",
    "exec",
    "spawn",
    "fork",
    "shell",
    "popen",
];

/// Namespaced functions that always raise a write violation.
const DENIED_NAMESPACED: &[(&str, &[&str])] = &[
    (
        "File",
        &["write", "delete", "unlink", "rename", "chmod", "chown", "truncate", "symlink", "new"],
    ),
    ("Dir", &["mkdir", "rmdir", "delete", "unlink", "chdir"]),
    (
        "FileUtils",
        &[
            "rm", "rm_f", "rm_r", "rm_rf", "mkdir", "mkdir_p", "cp", "cp_r", "mv", "touch", "ln_s",
            "chmod", "remove", "copy",
        ],
    ),
    ("Process", &["spawn", "exec", "fork", "kill"]),
    ("Kernel", &["system", "exec", "spawn"]),
    ("IO", &["write", "popen", "pipe"]),
    ("Open3", &["capture2", "capture3", "popen3"]),
];

/// Engine settings for one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Cap on captured output, in bytes.
    pub max_output_bytes: usize,
    /// Cap on interpreter operations, if any.
    pub max_operations: Option<u64>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_output_bytes: 1024 * 1024,
            max_operations: None,
        }
    }
}

/// How an evaluation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScriptStatus {
    Completed,
    Violation(Violation),
    Fault { class: String, message: String },
}

/// Captured output plus final status of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptReport {
    pub output: String,
    pub status: ScriptStatus,
}

impl ScriptReport {
    /// Report for a failure that happened before the script ran.
    pub fn fault(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            output: String::new(),
            status: ScriptStatus::Fault {
                class: class.into(),
                message: message.into(),
            },
        }
    }
}

impl From<ScriptReport> for ExecutionResult {
    /// Output only survives a clean completion.
    fn from(report: ScriptReport) -> Self {
        match report.status {
            ScriptStatus::Completed => ExecutionResult::from_output(report.output),
            ScriptStatus::Violation(v) => ExecutionResult::Violation(v),
            ScriptStatus::Fault { class, message } => ExecutionResult::RuntimeError { class, message },
        }
    }
}

/// Output capture with a byte cap.
#[derive(Debug)]
struct OutputBuffer {
    text: String,
    limit: usize,
    truncated: bool,
}

impl OutputBuffer {
    fn new(limit: usize) -> Self {
        Self {
            text: String::new(),
            limit,
            truncated: false,
        }
    }

    fn push_line(&mut self, line: &str) {
        self.push(line);
        self.push("\n");
    }

    fn push(&mut self, s: &str) {
        if self.truncated {
            return;
        }
        let remaining = self.limit.saturating_sub(self.text.len());
        if s.len() <= remaining {
            self.text.push_str(s);
            return;
        }

        let mut cut = remaining;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        self.text.push_str(&s[..cut]);
        self.text.push_str(TRUNCATION_MARKER);
        self.truncated = true;
    }
}

/// State shared by every registered function of one engine.
#[derive(Clone)]
struct Bridge {
    mediator: Rc<AccessMediator>,
    violation: Rc<RefCell<Option<Violation>>>,
}

impl Bridge {
    /// Record the first violation and turn it into a script error. The record
    /// survives a script-level `catch`.
    fn raise(&self, violation: Violation) -> Box<EvalAltResult> {
        let payload = error_payload(violation.kind.name(), &violation.message);
        let mut slot = self.violation.borrow_mut();
        if slot.is_none() {
            debug!(kind = %violation.kind, "Script raised violation");
            *slot = Some(violation);
        }
        Box::new(EvalAltResult::ErrorRuntime(payload, Position::NONE))
    }

    fn lift<T>(&self, result: Result<T, MediatorError>) -> RhaiResultOf<T> {
        result.map_err(|e| match e {
            MediatorError::Violation(v) => self.raise(v),
            MediatorError::Fault { class, message } => {
                Box::new(EvalAltResult::ErrorRuntime(error_payload(&class, &message), Position::NONE))
            }
        })
    }

    fn deny(&self, entry_point: &str) -> Box<EvalAltResult> {
        self.raise(self.mediator.deny(entry_point))
    }
}

fn error_payload(class: &str, message: &str) -> Dynamic {
    let mut map = Map::new();
    map.insert("class".into(), Dynamic::from(class.to_string()));
    map.insert("message".into(), Dynamic::from(message.to_string()));
    Dynamic::from_map(map)
}

fn to_array(items: Vec<String>) -> Array {
    items.into_iter().map(Dynamic::from).collect()
}

/// Evaluate script text against a mediator.
pub fn evaluate(mediator: AccessMediator, script: &str, options: &EngineOptions) -> ScriptReport {
    let output = Rc::new(RefCell::new(OutputBuffer::new(options.max_output_bytes)));
    let bridge = Bridge {
        mediator: Rc::new(mediator),
        violation: Rc::new(RefCell::new(None)),
    };

    let engine = build_engine(&bridge, &output, options);
    let result = engine.run(script);

    let violation = bridge.violation.borrow_mut().take();
    let output = std::mem::take(&mut output.borrow_mut().text);

    let status = match (violation, result) {
        (Some(v), _) => ScriptStatus::Violation(v),
        (None, Ok(())) => ScriptStatus::Completed,
        (None, Err(err)) => match reserved_entry_point(&err, script) {
            Some(entry_point) => {
                debug!(entry_point = %entry_point, "Script names a reserved denied entry point");
                ScriptStatus::Violation(bridge.mediator.deny(&entry_point))
            }
            None => {
                let (class, message) = classify(&err);
                debug!(class = %class, "Script faulted");
                ScriptStatus::Fault { class, message }
            }
        },
    };

    ScriptReport { output, status }
}

fn build_engine(
    bridge: &Bridge,
    output: &Rc<RefCell<OutputBuffer>>,
    options: &EngineOptions,
) -> Engine {
    let mut engine = Engine::new();
    engine.set_module_resolver(DummyModuleResolver::new());
    engine.disable_symbol("eval");
    engine.set_max_call_levels(64);
    if let Some(ops) = options.max_operations {
        engine.set_max_operations(ops);
    }

    let sink = output.clone();
    engine.on_print(move |s| sink.borrow_mut().push_line(s));
    let sink = output.clone();
    engine.on_debug(move |s, _, _| sink.borrow_mut().push_line(s));

    engine
        .register_type_with_name::<ReadView>("ReadView")
        .register_fn("read", |v: &mut ReadView| v.read().to_string())
        .register_fn("to_string", |v: &mut ReadView| v.read().to_string())
        .register_fn("lines", |v: &mut ReadView| to_array(v.lines()))
        .register_fn("size", |v: &mut ReadView| v.size() as INT);

    let mut globals = Module::new();
    register_readers(&mut globals, bridge);
    for name in DENIED_GLOBALS {
        register_denied(&mut globals, name, name.to_string(), bridge);
    }
    engine.register_global_module(globals.into());

    for (namespace, functions) in DENIED_NAMESPACED {
        let mut module = Module::new();
        match *namespace {
            "File" => register_file_readers(&mut module, bridge),
            "Dir" => register_dir_readers(&mut module, bridge),
            _ => {}
        }
        for name in *functions {
            register_denied(&mut module, name, format!("{}::{}", namespace, name), bridge);
        }
        engine.register_static_module(*namespace, module.into());
    }

    engine
}

fn register_readers(module: &mut Module, bridge: &Bridge) {
    let b = bridge.clone();
    module.set_native_fn("read_file", move |p: ImmutableString| b.lift(b.mediator.read(&p)));
    let b = bridge.clone();
    module.set_native_fn("file_exists", move |p: ImmutableString| b.lift(b.mediator.exists(&p)));
    let b = bridge.clone();
    module.set_native_fn("is_file", move |p: ImmutableString| b.lift(b.mediator.is_file(&p)));
    let b = bridge.clone();
    module.set_native_fn("is_directory", move |p: ImmutableString| {
        b.lift(b.mediator.is_directory(&p))
    });
    let b = bridge.clone();
    module.set_native_fn("open", move |p: ImmutableString| b.lift(b.mediator.open(&p, None)));
    let b = bridge.clone();
    module.set_native_fn("open", move |p: ImmutableString, mode: ImmutableString| {
        b.lift(b.mediator.open(&p, Some(mode.as_str())))
    });
    let b = bridge.clone();
    module.set_native_fn("entries", move |p: ImmutableString| {
        b.lift(b.mediator.entries(&p)).map(to_array)
    });
    for name in ["glob", "list_files"] {
        let b = bridge.clone();
        module.set_native_fn(name, move |p: ImmutableString| {
            b.lift(b.mediator.glob(&p)).map(to_array)
        });
    }
    let b = bridge.clone();
    module.set_native_fn("project_root", move || -> RhaiResultOf<String> {
        Ok(b.mediator.project_root())
    });
}

fn register_file_readers(module: &mut Module, bridge: &Bridge) {
    let b = bridge.clone();
    module.set_native_fn("read", move |p: ImmutableString| b.lift(b.mediator.read(&p)));
    let b = bridge.clone();
    module.set_native_fn("exists", move |p: ImmutableString| b.lift(b.mediator.exists(&p)));
    let b = bridge.clone();
    module.set_native_fn("file", move |p: ImmutableString| b.lift(b.mediator.is_file(&p)));
    let b = bridge.clone();
    module.set_native_fn("directory", move |p: ImmutableString| {
        b.lift(b.mediator.is_directory(&p))
    });
    let b = bridge.clone();
    module.set_native_fn("open", move |p: ImmutableString| b.lift(b.mediator.open(&p, None)));
    let b = bridge.clone();
    module.set_native_fn("open", move |p: ImmutableString, mode: ImmutableString| {
        b.lift(b.mediator.open(&p, Some(mode.as_str())))
    });
}

fn register_dir_readers(module: &mut Module, bridge: &Bridge) {
    let b = bridge.clone();
    module.set_native_fn("exists", move |p: ImmutableString| b.lift(b.mediator.is_directory(&p)));
    let b = bridge.clone();
    module.set_native_fn("entries", move |p: ImmutableString| {
        b.lift(b.mediator.entries(&p)).map(to_array)
    });
    let b = bridge.clone();
    module.set_native_fn("glob", move |p: ImmutableString| {
        b.lift(b.mediator.glob(&p)).map(to_array)
    });
}

/// Register `name` at arities 0 through 3, each raising a write violation.
fn register_denied(module: &mut Module, name: &str, entry_point: String, bridge: &Bridge) {
    let (b, e) = (bridge.clone(), entry_point.clone());
    module.set_native_fn(name, move || -> RhaiResultOf<Dynamic> { Err(b.deny(&e)) });
    let (b, e) = (bridge.clone(), entry_point.clone());
    module.set_native_fn(name, move |_: Dynamic| -> RhaiResultOf<Dynamic> { Err(b.deny(&e)) });
    let (b, e) = (bridge.clone(), entry_point.clone());
    module.set_native_fn(name, move |_: Dynamic, _: Dynamic| -> RhaiResultOf<Dynamic> {
        Err(b.deny(&e))
    });
    let (b, e) = (bridge.clone(), entry_point);
    module.set_native_fn(
        name,
        move |_: Dynamic, _: Dynamic, _: Dynamic| -> RhaiResultOf<Dynamic> { Err(b.deny(&e)) },
    );
}

/// Denied entry points whose names are reserved keywords (`spawn`, `new`)
/// never parse. Recover the call the script attempted so it is reported as
/// the write violation it is, not a syntax error.
fn reserved_entry_point(err: &EvalAltResult, script: &str) -> Option<String> {
    let EvalAltResult::ErrorParsing(ParseErrorType::Reserved(name), _) = err else {
        return None;
    };
    let call = Regex::new(&format!(
        r"(?:\b([A-Za-z_]\w*)\s*::\s*)?\b{}\s*\(",
        regex::escape(name)
    ))
    .ok()?;

    let found = call.captures_iter(script).find_map(|caps| match caps.get(1) {
        Some(namespace) => DENIED_NAMESPACED
            .iter()
            .find(|(ns, functions)| *ns == namespace.as_str() && functions.contains(&name.as_str()))
            .map(|(ns, _)| format!("{}::{}", ns, name)),
        None => DENIED_GLOBALS.contains(&name.as_str()).then(|| name.clone()),
    });
    found
}

/// Reduce an engine error to a fault class and message.
fn classify(err: &EvalAltResult) -> (String, String) {
    let class = match err {
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => return classify(inner),
        EvalAltResult::ErrorInModule(_, inner, _) => return classify(inner),
        EvalAltResult::ErrorRuntime(payload, _) => return classify_payload(payload),
        EvalAltResult::ErrorParsing(..) => "SyntaxError",
        EvalAltResult::ErrorFunctionNotFound(..) => "NoMethodError",
        EvalAltResult::ErrorVariableNotFound(..) => "NameError",
        EvalAltResult::ErrorArithmetic(..) => "ArithmeticError",
        EvalAltResult::ErrorMismatchDataType(..) | EvalAltResult::ErrorMismatchOutputType(..) => {
            "TypeError"
        }
        EvalAltResult::ErrorIndexingType(..)
        | EvalAltResult::ErrorArrayBounds(..)
        | EvalAltResult::ErrorStringBounds(..) => "IndexError",
        EvalAltResult::ErrorTooManyOperations(..)
        | EvalAltResult::ErrorDataTooLarge(..)
        | EvalAltResult::ErrorStackOverflow(..) => "LimitExceeded",
        EvalAltResult::ErrorModuleNotFound(..) => "LoadError",
        _ => "ScriptError",
    };
    (class.to_string(), err.to_string())
}

fn classify_payload(payload: &Dynamic) -> (String, String) {
    if let Some(map) = payload.clone().try_cast::<Map>() {
        let field = |key: &str| map.get(key).map(|v| v.to_string());
        if let (Some(class), Some(message)) = (field("class"), field("message")) {
            return (class, message);
        }
    }
    ("RuntimeError".to_string(), payload.to_string())
}
