//! Tree-walking evaluator.
//!
//! Statement and expression evaluation is recursive through boxed futures so
//! that `roll(...)` and action activation can suspend mid-expression. Every
//! other operation completes synchronously against the [`RuntimeState`].

use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use questbound_domain::{format_number, ActionId, CharacterId, ScriptEntityType, ScriptEvent};

use super::accessors::{chart_column, chart_where, quantity_arg, RuntimeState, ScriptBindings};
use super::ast::{AssignOp, BinaryOp, Expr, FunctionDef, Program, Stmt, StmtKind, UnaryOp};
use super::environment::{is_reserved, Environment};
use super::error::EvaluationError;
use super::parser::parse_source;
use super::value::{Builtin, ObjectRef, Value};

/// User function recursion bound.
pub const MAX_CALL_DEPTH: usize = 64;

enum Flow {
    Normal,
    Return(Value),
}

type EvalResult<T> = Result<T, EvaluationError>;

pub struct Evaluator<'a> {
    state: &'a mut RuntimeState,
    bindings: ScriptBindings,
    env: Environment,
    action_depth: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(state: &'a mut RuntimeState, bindings: ScriptBindings) -> Self {
        Self::nested(state, bindings, 0)
    }

    fn nested(state: &'a mut RuntimeState, bindings: ScriptBindings, action_depth: usize) -> Self {
        Self {
            state,
            bindings,
            env: Environment::new(),
            action_depth,
        }
    }

    /// Run the top level of a program. A top-level `return` ends the script early.
    pub async fn run(&mut self, program: &Program) -> EvalResult<Value> {
        match self.exec_block(&program.statements).await? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Null),
        }
    }

    /// Call the handler the top level defined for `event`, if any.
    pub async fn invoke_handler(&mut self, event: ScriptEvent) -> EvalResult<Option<Value>> {
        let Some(Value::Function(def)) = self.env.get_global(event.as_str()).cloned() else {
            return Ok(None);
        };
        tracing::debug!(handler = %event, "Invoking event handler");
        self.call_function(def, Vec::new()).await.map(Some)
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn exec_block<'b>(&'b mut self, statements: &'b [Stmt]) -> BoxFuture<'b, EvalResult<Flow>> {
        async move {
            for statement in statements {
                if let Flow::Return(value) = self.exec(statement).await? {
                    return Ok(Flow::Return(value));
                }
            }
            Ok(Flow::Normal)
        }
        .boxed()
    }

    fn exec<'b>(&'b mut self, statement: &'b Stmt) -> BoxFuture<'b, EvalResult<Flow>> {
        async move {
            self.exec_kind(&statement.kind)
                .await
                .map_err(|e| e.at_line(statement.line))
        }
        .boxed()
    }

    async fn exec_kind(&mut self, kind: &StmtKind) -> EvalResult<Flow> {
        match kind {
            StmtKind::Expr(expr) => {
                self.eval(expr).await?;
            }
            StmtKind::Assign { target, op, value } => self.assign(target, *op, value).await?,
            StmtKind::If {
                branches,
                else_branch,
            } => {
                for (condition, body) in branches {
                    if self.eval(condition).await?.is_truthy() {
                        return self.exec_block(body).await;
                    }
                }
                if let Some(body) = else_branch {
                    return self.exec_block(body).await;
                }
            }
            StmtKind::For {
                variable,
                iterable,
                body,
            } => {
                if is_reserved(variable) {
                    return Err(reassign_builtin(variable));
                }
                let items = match self.eval(iterable).await? {
                    Value::List(items) => items,
                    Value::String(s) => s.chars().map(|c| Value::String(c.to_string())).collect(),
                    other => {
                        return Err(EvaluationError::new(format!(
                            "Cannot iterate over {}",
                            other.type_name()
                        )))
                    }
                };
                for item in items {
                    self.env.set(variable, item);
                    if let Flow::Return(value) = self.exec_block(body).await? {
                        return Ok(Flow::Return(value));
                    }
                }
            }
            StmtKind::FunctionDef(def) => {
                if is_reserved(&def.name) {
                    return Err(EvaluationError::new(format!(
                        "Cannot redefine built-in '{}'",
                        def.name
                    )));
                }
                if let Some(param) = def.params.iter().find(|p| is_reserved(p)) {
                    return Err(EvaluationError::new(format!(
                        "Cannot use built-in '{}' as a parameter name",
                        param
                    )));
                }
                self.env
                    .define(def.name.clone(), Value::Function(Arc::clone(def)));
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr).await?,
                    None => Value::Null,
                };
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    async fn assign(&mut self, target: &Expr, op: AssignOp, value: &Expr) -> EvalResult<()> {
        match target {
            Expr::Identifier(name) => {
                if is_reserved(name) {
                    return Err(reassign_builtin(name));
                }
                let rhs = self.eval(value).await?;
                let new_value = match op.binary() {
                    None => rhs,
                    Some(binary) => {
                        let current = self.env.get(name).cloned().ok_or_else(|| undefined(name))?;
                        binary_values(binary, current, rhs)?
                    }
                };
                self.env.set(name, new_value);
                Ok(())
            }
            Expr::Member { object, property } => {
                let receiver = self.eval(object).await?;
                let rhs = self.eval(value).await?;
                match receiver {
                    Value::Null => Err(EvaluationError::new(format!(
                        "Cannot set property '{}' of null",
                        property
                    ))),
                    Value::Object(ObjectRef::Attribute {
                        character_id,
                        attribute_id,
                    }) if property == "value" => {
                        let new_value = match op.binary() {
                            None => rhs,
                            Some(binary) => {
                                let current =
                                    self.state
                                        .attribute_property(character_id, attribute_id, "value")?;
                                binary_values(binary, current, rhs)?
                            }
                        };
                        self.state.call_attribute_method(
                            character_id,
                            attribute_id,
                            "set",
                            &[new_value],
                        )?;
                        Ok(())
                    }
                    other => Err(EvaluationError::new(format!(
                        "Cannot assign to property '{}' of {}",
                        property,
                        other.type_name()
                    ))),
                }
            }
            Expr::Index { object, index } => {
                let Expr::Identifier(name) = object.as_ref() else {
                    return Err(EvaluationError::new(
                        "Only list variables can be assigned by index",
                    ));
                };
                if is_reserved(name) {
                    return Err(reassign_builtin(name));
                }
                let position = self.eval(index).await?;
                let rhs = self.eval(value).await?;
                let mut items = match self.env.get(name) {
                    Some(Value::List(items)) => items.clone(),
                    Some(other) => {
                        return Err(EvaluationError::new(format!(
                            "Cannot assign by index into {}",
                            other.type_name()
                        )))
                    }
                    None => return Err(undefined(name)),
                };
                let i = list_index(&position, items.len())?;
                items[i] = match op.binary() {
                    None => rhs,
                    Some(binary) => binary_values(binary, items[i].clone(), rhs)?,
                };
                self.env.set(name, Value::List(items));
                Ok(())
            }
            _ => Err(EvaluationError::new("Invalid assignment target")),
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn eval<'b>(&'b mut self, expr: &'b Expr) -> BoxFuture<'b, EvalResult<Value>> {
        async move {
            match expr {
                Expr::Number(n) => Ok(Value::Number(*n)),
                Expr::String(s) => Ok(Value::String(s.clone())),
                Expr::Boolean(b) => Ok(Value::Boolean(*b)),
                Expr::Null => Ok(Value::Null),
                Expr::List(items) => {
                    let mut values = Vec::with_capacity(items.len());
                    for item in items {
                        values.push(self.eval(item).await?);
                    }
                    Ok(Value::List(values))
                }
                Expr::Identifier(name) => self.lookup(name),
                Expr::Unary { op, operand } => {
                    let value = self.eval(operand).await?;
                    match (op, value) {
                        (UnaryOp::Not, value) => Ok(Value::Boolean(!value.is_truthy())),
                        (UnaryOp::Negate, Value::Number(n)) => Ok(Value::Number(-n)),
                        (UnaryOp::Negate, other) => Err(EvaluationError::new(format!(
                            "Cannot negate {}",
                            other.type_name()
                        ))),
                    }
                }
                Expr::Binary {
                    op: BinaryOp::And,
                    left,
                    right,
                } => {
                    let left = self.eval(left).await?;
                    if !left.is_truthy() {
                        return Ok(left);
                    }
                    self.eval(right).await
                }
                Expr::Binary {
                    op: BinaryOp::Or,
                    left,
                    right,
                } => {
                    let left = self.eval(left).await?;
                    if left.is_truthy() {
                        return Ok(left);
                    }
                    self.eval(right).await
                }
                Expr::Binary { op, left, right } => {
                    let left = self.eval(left).await?;
                    let right = self.eval(right).await?;
                    binary_values(*op, left, right)
                }
                Expr::Member { object, property } => {
                    let receiver = self.eval(object).await?;
                    self.read_property(receiver, property)
                }
                Expr::Index { object, index } => {
                    let container = self.eval(object).await?;
                    let position = self.eval(index).await?;
                    index_value(container, &position)
                }
                Expr::Call { callee, args } => self.call(callee, args).await,
            }
        }
        .boxed()
    }

    fn lookup(&mut self, name: &str) -> EvalResult<Value> {
        match name {
            "Owner" => return Ok(Value::Object(ObjectRef::Character(self.bindings.owner))),
            "Target" => {
                return Ok(self
                    .bindings
                    .target
                    .map(|id| Value::Object(ObjectRef::Character(id)))
                    .unwrap_or(Value::Null))
            }
            "Ruleset" => return Ok(Value::Object(ObjectRef::Ruleset)),
            "Self" => {
                let Some(attribute_id) = self.bindings.self_attribute else {
                    return Ok(Value::Null);
                };
                let definition = self.state.attribute_definition(attribute_id)?.clone();
                self.state
                    .ensure_character_attribute(self.bindings.owner, &definition)?;
                return Ok(Value::Object(ObjectRef::Attribute {
                    character_id: self.bindings.owner,
                    attribute_id,
                }));
            }
            _ => {}
        }
        if let Some(builtin) = Builtin::from_name(name) {
            return Ok(Value::Builtin(builtin));
        }
        self.env.get(name).cloned().ok_or_else(|| undefined(name))
    }

    async fn eval_args(&mut self, args: &[Expr]) -> EvalResult<Vec<Value>> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg).await?);
        }
        Ok(values)
    }

    async fn call(&mut self, callee: &Expr, args: &[Expr]) -> EvalResult<Value> {
        match callee {
            Expr::Member { object, property } => {
                let receiver = self.eval(object).await?;
                if receiver.is_null() {
                    return Err(EvaluationError::new(format!(
                        "Cannot call method '{}' on null",
                        property
                    )));
                }
                let args = self.eval_args(args).await?;
                self.call_method(receiver, property, args).await
            }
            // Subscriptions are resolved statically; the call itself does nothing.
            Expr::Identifier(name) if name == Builtin::Subscribe.name() => Ok(Value::Null),
            _ => {
                let function = self.eval(callee).await?;
                let args = self.eval_args(args).await?;
                match function {
                    Value::Function(def) => self.call_function(def, args).await,
                    Value::Builtin(builtin) => self.call_builtin(builtin, args).await,
                    Value::Null => Err(EvaluationError::new("Cannot call null")),
                    other => Err(EvaluationError::new(format!(
                        "{} is not a function",
                        other.type_name()
                    ))),
                }
            }
        }
    }

    async fn call_function(&mut self, def: Arc<FunctionDef>, args: Vec<Value>) -> EvalResult<Value> {
        if args.len() > def.params.len() {
            return Err(EvaluationError::new(format!(
                "Function '{}' expects at most {} arguments, got {}",
                def.name,
                def.params.len(),
                args.len()
            )));
        }
        if self.env.depth() >= MAX_CALL_DEPTH {
            return Err(EvaluationError::new(format!(
                "Maximum call depth exceeded in '{}'",
                def.name
            )));
        }

        self.env.push_frame();
        let mut args = args.into_iter();
        for param in &def.params {
            self.env.define(param.clone(), args.next().unwrap_or(Value::Null));
        }
        let flow = self.exec_block(&def.body).await;
        self.env.pop_frame();

        match flow? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Null),
        }
    }

    // ------------------------------------------------------------------
    // Built-ins
    // ------------------------------------------------------------------

    async fn call_builtin(&mut self, builtin: Builtin, args: Vec<Value>) -> EvalResult<Value> {
        match builtin {
            Builtin::Subscribe => Ok(Value::Null),
            Builtin::Roll => {
                let expression = match one_arg(builtin.name(), &args)? {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => format_number(*n),
                    other => {
                        return Err(EvaluationError::new(format!(
                            "roll() expects a dice expression, got {}",
                            other.type_name()
                        )))
                    }
                };
                let dice = Arc::clone(&self.state.dice);
                let total = dice
                    .roll(&expression)
                    .await
                    .map_err(|e| EvaluationError::new(e.to_string()))?;
                Ok(Value::Number(total))
            }
            Builtin::Announce => {
                let message = one_arg(builtin.name(), &args)?.to_string();
                self.state.announce(message);
                Ok(Value::Null)
            }
            Builtin::Log => {
                let line = args
                    .iter()
                    .map(Value::to_string)
                    .collect::<Vec<_>>()
                    .join(" ");
                self.state.log(line);
                Ok(Value::Null)
            }
            Builtin::Floor | Builtin::Ceil | Builtin::Round => {
                let n = one_arg(builtin.name(), &args)?.as_number().ok_or_else(|| {
                    EvaluationError::new(format!("{}() expects a number", builtin.name()))
                })?;
                Ok(Value::Number(match builtin {
                    Builtin::Floor => n.floor(),
                    Builtin::Ceil => n.ceil(),
                    _ => n.round(),
                }))
            }
            Builtin::GetAttr => {
                let title = string_arg(builtin.name(), &args, 0)?;
                let owner = self.bindings.owner;
                let attribute_id = self.state.resolve_attribute(owner, &title)?;
                self.state.attribute_property(owner, attribute_id, "value")
            }
            Builtin::GetChart => {
                let title = string_arg(builtin.name(), &args, 0)?;
                self.chart_ref(&title)
            }
        }
    }

    fn chart_ref(&self, title: &str) -> EvalResult<Value> {
        self.state
            .ruleset()
            .chart_by_title(title)
            .map(|chart| Value::Object(ObjectRef::Chart(chart.id)))
            .ok_or_else(|| EvaluationError::new(format!("Chart '{}' not found", title)))
    }

    // ------------------------------------------------------------------
    // Accessor objects
    // ------------------------------------------------------------------

    async fn call_method(&mut self, receiver: Value, method: &str, args: Vec<Value>) -> EvalResult<Value> {
        let object = match receiver {
            Value::Object(object) => object,
            other => return Err(unknown_method(method, other.type_name())),
        };

        match object {
            ObjectRef::Character(character_id) => {
                self.character_method(character_id, method, args).await
            }
            ObjectRef::Ruleset => match method {
                "Chart" => {
                    let title = string_arg(method, &args, 0)?;
                    self.chart_ref(&title)
                }
                _ => Err(unknown_method(method, object.kind())),
            },
            ObjectRef::Attribute {
                character_id,
                attribute_id,
            } => self
                .state
                .call_attribute_method(character_id, attribute_id, method, &args),
            ObjectRef::Chart(chart_id) => {
                let chart = self
                    .state
                    .ruleset()
                    .chart(chart_id)
                    .ok_or_else(|| EvaluationError::new(format!("Chart {} not found", chart_id)))?;
                match method {
                    "where" => {
                        if args.len() != 3 {
                            return Err(EvaluationError::new(format!(
                                "where() expects 3 arguments, got {}",
                                args.len()
                            )));
                        }
                        let source = string_arg(method, &args, 0)?;
                        let target = string_arg(method, &args, 2)?;
                        chart_where(chart, &source, &args[1], &target)
                    }
                    "column" => chart_column(chart, &string_arg(method, &args, 0)?),
                    _ => Err(unknown_method(method, object.kind())),
                }
            }
            ObjectRef::Action {
                character_id,
                action_id,
            } => {
                let event = match method {
                    "activate" => ScriptEvent::OnActivate,
                    "deactivate" => ScriptEvent::OnDeactivate,
                    _ => return Err(unknown_method(method, object.kind())),
                };
                self.activate_action(character_id, action_id, event).await
            }
            ObjectRef::Item { .. } => Err(unknown_method(method, object.kind())),
        }
    }

    async fn character_method(
        &mut self,
        character_id: CharacterId,
        method: &str,
        args: Vec<Value>,
    ) -> EvalResult<Value> {
        match method {
            "Attribute" => {
                let title = string_arg(method, &args, 0)?;
                let attribute_id = self.state.resolve_attribute(character_id, &title)?;
                Ok(Value::Object(ObjectRef::Attribute {
                    character_id,
                    attribute_id,
                }))
            }
            "Item" => {
                let title = string_arg(method, &args, 0)?;
                Ok(self
                    .state
                    .item_refs(character_id, &title)?
                    .into_iter()
                    .next()
                    .unwrap_or(Value::Null))
            }
            "Items" => {
                let title = string_arg(method, &args, 0)?;
                Ok(Value::List(self.state.item_refs(character_id, &title)?))
            }
            "hasItem" => {
                let title = string_arg(method, &args, 0)?;
                Ok(Value::Boolean(self.state.item_count(character_id, &title)? > 0))
            }
            "addItem" => {
                let title = string_arg(method, &args, 0)?;
                let quantity = quantity_arg(args.get(1), method)?;
                self.state.add_item(character_id, &title, quantity)?;
                Ok(Value::Null)
            }
            "removeItem" => {
                let title = string_arg(method, &args, 0)?;
                let quantity = quantity_arg(args.get(1), method)?;
                let removed = self.state.remove_item(character_id, &title, quantity)?;
                Ok(Value::Number(f64::from(removed)))
            }
            "setItem" => {
                let title = string_arg(method, &args, 0)?;
                let Some(quantity) = args.get(1) else {
                    return Err(EvaluationError::new("setItem() expects a quantity"));
                };
                let quantity = quantity_arg(Some(quantity), method)?;
                self.state.set_item(character_id, &title, quantity)?;
                Ok(Value::Null)
            }
            "Action" => {
                let title = string_arg(method, &args, 0)?;
                let action = self
                    .state
                    .ruleset()
                    .action_by_title(&title)
                    .ok_or_else(|| EvaluationError::new(format!("Action '{}' not found", title)))?;
                Ok(Value::Object(ObjectRef::Action {
                    character_id,
                    action_id: action.id,
                }))
            }
            _ => Err(unknown_method(method, "character")),
        }
    }

    /// Run the action's script (top level, then the event handler) with the
    /// acting character as owner, sharing this run's state.
    async fn activate_action(
        &mut self,
        character_id: CharacterId,
        action_id: ActionId,
        event: ScriptEvent,
    ) -> EvalResult<Value> {
        if self.action_depth >= self.state.max_action_depth {
            return Err(EvaluationError::new(format!(
                "Action activation nested deeper than {} levels",
                self.state.max_action_depth
            )));
        }
        let Some(script) = self
            .state
            .ruleset()
            .script_for(ScriptEntityType::Action, action_id.to_uuid())
            .cloned()
        else {
            return Ok(Value::Null);
        };

        let in_action = |message: String| {
            EvaluationError::new(format!("In action script '{}': {}", script.name, message))
        };
        let program = parse_source(&script.source_code).map_err(|e| in_action(e.to_string()))?;
        let bindings = ScriptBindings::new(character_id).with_target(self.bindings.target);

        tracing::debug!(script_id = %script.id, event = %event, depth = self.action_depth + 1, "Activating action");
        let mut nested = Evaluator::nested(&mut *self.state, bindings, self.action_depth + 1);
        nested.run(&program).await.map_err(|e| in_action(e.to_string()))?;
        nested
            .invoke_handler(event)
            .await
            .map_err(|e| in_action(e.to_string()))?;
        Ok(Value::Null)
    }

    fn read_property(&self, receiver: Value, property: &str) -> EvalResult<Value> {
        match receiver {
            Value::Null => Err(EvaluationError::new(format!(
                "Cannot read property '{}' of null",
                property
            ))),
            Value::Object(ObjectRef::Attribute {
                character_id,
                attribute_id,
            }) => self
                .state
                .attribute_property(character_id, attribute_id, property),
            Value::Object(ObjectRef::Item {
                character_id,
                inventory_item_id,
            }) => self
                .state
                .item_property(character_id, inventory_item_id, property),
            Value::Object(ObjectRef::Character(character_id)) if property == "name" => Ok(
                Value::from(self.state.sheet(character_id)?.character.name.as_str()),
            ),
            Value::Object(ObjectRef::Chart(chart_id)) if property == "title" => self
                .state
                .ruleset()
                .chart(chart_id)
                .map(|chart| Value::from(chart.title.as_str()))
                .ok_or_else(|| EvaluationError::new(format!("Chart {} not found", chart_id))),
            Value::Object(ObjectRef::Action { action_id, .. }) if property == "title" => self
                .state
                .ruleset()
                .action(action_id)
                .map(|action| Value::from(action.title.as_str()))
                .ok_or_else(|| EvaluationError::new(format!("Action {} not found", action_id))),
            Value::List(items) if property == "length" => Ok(Value::Number(items.len() as f64)),
            Value::String(s) if property == "length" => {
                Ok(Value::Number(s.chars().count() as f64))
            }
            other => Err(EvaluationError::new(format!(
                "Unknown property '{}' on {}",
                property,
                other.type_name()
            ))),
        }
    }
}

// ----------------------------------------------------------------------
// Operators and argument helpers
// ----------------------------------------------------------------------

fn binary_values(op: BinaryOp, left: Value, right: Value) -> EvalResult<Value> {
    use Value::{Boolean, List, Number};

    let value = match (op, left, right) {
        (BinaryOp::Equal, l, r) => Boolean(l == r),
        (BinaryOp::NotEqual, l, r) => Boolean(l != r),
        (BinaryOp::And, l, r) => {
            if l.is_truthy() {
                r
            } else {
                l
            }
        }
        (BinaryOp::Or, l, r) => {
            if l.is_truthy() {
                l
            } else {
                r
            }
        }
        (BinaryOp::Add, Number(a), Number(b)) => Number(a + b),
        (BinaryOp::Add, List(mut a), List(b)) => {
            a.extend(b);
            List(a)
        }
        (BinaryOp::Add, l @ Value::String(_), r) | (BinaryOp::Add, l, r @ Value::String(_)) => {
            Value::String(format!("{}{}", l, r))
        }
        (BinaryOp::Subtract, Number(a), Number(b)) => Number(a - b),
        (BinaryOp::Multiply, Number(a), Number(b)) => Number(a * b),
        (BinaryOp::Power, Number(a), Number(b)) => Number(a.powf(b)),
        (BinaryOp::Divide | BinaryOp::Modulo, Number(_), Number(b)) if b == 0.0 => {
            return Err(EvaluationError::new("Cannot divide by zero"))
        }
        (BinaryOp::Divide, Number(a), Number(b)) => Number(a / b),
        (BinaryOp::Modulo, Number(a), Number(b)) => Number(a % b),
        (BinaryOp::Greater, Number(a), Number(b)) => Boolean(a > b),
        (BinaryOp::GreaterEqual, Number(a), Number(b)) => Boolean(a >= b),
        (BinaryOp::Less, Number(a), Number(b)) => Boolean(a < b),
        (BinaryOp::LessEqual, Number(a), Number(b)) => Boolean(a <= b),
        (BinaryOp::Greater, Value::String(a), Value::String(b)) => Boolean(a > b),
        (BinaryOp::GreaterEqual, Value::String(a), Value::String(b)) => Boolean(a >= b),
        (BinaryOp::Less, Value::String(a), Value::String(b)) => Boolean(a < b),
        (BinaryOp::LessEqual, Value::String(a), Value::String(b)) => Boolean(a <= b),
        (op, l, r) => {
            return Err(EvaluationError::new(format!(
                "Cannot apply '{}' to {} and {}",
                op.symbol(),
                l.type_name(),
                r.type_name()
            )))
        }
    };
    Ok(value)
}

fn index_value(container: Value, position: &Value) -> EvalResult<Value> {
    match container {
        Value::List(items) => {
            let i = list_index(position, items.len())?;
            Ok(items[i].clone())
        }
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            let i = list_index(position, chars.len())?;
            Ok(Value::String(chars[i].to_string()))
        }
        Value::Null => Err(EvaluationError::new("Cannot index into null")),
        other => Err(EvaluationError::new(format!(
            "Cannot index into {}",
            other.type_name()
        ))),
    }
}

fn list_index(position: &Value, len: usize) -> EvalResult<usize> {
    match position {
        Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 && (*n as usize) < len => Ok(*n as usize),
        Value::Number(n) => Err(EvaluationError::new(format!(
            "Index {} is out of range for length {}",
            format_number(*n),
            len
        ))),
        other => Err(EvaluationError::new(format!(
            "Index must be a number, got {}",
            other.type_name()
        ))),
    }
}

fn one_arg<'v>(name: &str, args: &'v [Value]) -> EvalResult<&'v Value> {
    match args {
        [value] => Ok(value),
        _ => Err(EvaluationError::new(format!(
            "{}() expects 1 argument, got {}",
            name,
            args.len()
        ))),
    }
}

fn string_arg(name: &str, args: &[Value], index: usize) -> EvalResult<String> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(EvaluationError::new(format!(
            "{}() expects a string argument, got {}",
            name,
            other.type_name()
        ))),
        None => Err(EvaluationError::new(format!(
            "{}() is missing argument {}",
            name,
            index + 1
        ))),
    }
}

fn undefined(name: &str) -> EvaluationError {
    EvaluationError::new(format!("Undefined variable '{}'", name))
}

fn reassign_builtin(name: &str) -> EvaluationError {
    EvaluationError::new(format!("Cannot reassign built-in '{}'", name))
}

fn unknown_method(method: &str, kind: &str) -> EvaluationError {
    EvaluationError::new(format!("Unknown method '{}' on {}", method, kind))
}
