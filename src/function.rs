//! Callable objects: user closures and native built-ins.

use std::sync::Arc;

use crate::builtins::NativeOp;
use crate::call::Call;
use crate::error::{JsError, SourceLocation};
use crate::object::ObjectRef;
use crate::string_dict;
use crate::value::{CheapClone, JsString, JsValue};

/// Body of a user function, produced by a compiler outside this crate.
///
/// On entry the frame has its scope chain filled (captured scopes plus a
/// fresh activation object holding the parameters and `arguments`), `this`
/// at argument index -1 and the actuals at indices `0..argc`.
pub trait CompiledCode: Send + Sync {
    fn execute(&self, call: &mut Call, argc: usize) -> Result<JsValue, JsError>;

    /// Where the function was defined
    fn location(&self) -> Option<SourceLocation> {
        None
    }

    /// Source text for `Function.prototype.toString`
    fn source_text(&self) -> Option<&str> {
        None
    }
}

impl<F> CompiledCode for F
where
    F: Fn(&mut Call, usize) -> Result<JsValue, JsError> + Send + Sync,
{
    fn execute(&self, call: &mut Call, argc: usize) -> Result<JsValue, JsError> {
        self(call, argc)
    }
}

/// A user-defined function with its captured scope chain
#[derive(Clone)]
pub struct Closure {
    name: Option<JsString>,
    params: Arc<[JsString]>,
    code: Arc<dyn CompiledCode>,
    /// Enclosing scopes at definition time; index 0 is the global object
    scope: Arc<[JsValue]>,
}

impl Closure {
    pub fn new(
        name: Option<JsString>,
        params: Vec<JsString>,
        code: Arc<dyn CompiledCode>,
        scope: Vec<JsValue>,
    ) -> Self {
        Self {
            name,
            params: params.into(),
            code,
            scope: scope.into(),
        }
    }

    pub fn name(&self) -> Option<&JsString> {
        self.name.as_ref()
    }

    pub fn params(&self) -> &[JsString] {
        &self.params
    }

    pub fn scope(&self) -> &[JsValue] {
        &self.scope
    }

    pub fn code(&self) -> &Arc<dyn CompiledCode> {
        &self.code
    }

    /// Run the body in `call`, which already holds `this` and the arguments.
    pub(crate) fn invoke(
        &self,
        callee: &ObjectRef,
        call: &mut Call,
        argc: usize,
    ) -> Result<JsValue, JsError> {
        call.fill_scope(self)?;
        let activation = call.create_activation(callee, &self.params, argc)?;
        call.push_scope(JsValue::Object(activation))?;
        if let Some(location) = self.code.location() {
            call.set_location(location);
        }
        self.code.execute(call, argc)
    }
}

/// A built-in function identified by its opcode
#[derive(Debug, Clone)]
pub struct NativeFunction {
    pub name: JsString,
    pub arity: u32,
    pub op: NativeOp,
}

#[derive(Clone)]
pub enum Function {
    Closure(Closure),
    Native(NativeFunction),
}

impl Function {
    pub fn name(&self) -> JsString {
        match self {
            Function::Closure(c) => c
                .name
                .as_ref()
                .map(CheapClone::cheap_clone)
                .unwrap_or_else(|| string_dict::intern("anonymous")),
            Function::Native(n) => n.name.cheap_clone(),
        }
    }

    /// Declared parameter count, exposed as `length`
    pub fn arity(&self) -> u32 {
        match self {
            Function::Closure(c) => c.params.len() as u32,
            Function::Native(n) => n.arity,
        }
    }

    /// Text for `Function.prototype.toString`
    pub fn source_string(&self) -> String {
        match self {
            Function::Closure(c) => match c.code.source_text() {
                Some(text) => text.to_string(),
                None => {
                    let params: Vec<&str> = c.params.iter().map(JsString::as_str).collect();
                    format!(
                        "function {}({}) {{\n    [compiled code]\n}}",
                        self.name(),
                        params.join(", ")
                    )
                }
            },
            Function::Native(n) => format!(
                "function {}() {{\n    [native code {}]\n}}",
                n.name,
                n.op.code()
            ),
        }
    }
}
