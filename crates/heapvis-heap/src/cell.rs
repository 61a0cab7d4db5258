use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

/// A strong reference to a heap cell.
pub type Obj = Arc<Cell>;

/// Suspended computation over its captured cells.
pub type Code = Arc<dyn Fn(&[Obj]) -> Node + Send + Sync>;

/// Contents of a cell.
#[derive(Clone)]
pub enum Node {
    Int(i64),
    /// A saturated constructor application.
    Con { name: String, args: Vec<Obj> },
    /// Unevaluated until forced; then overwritten with its result.
    Thunk {
        label: String,
        captured: Vec<Obj>,
        code: Code,
    },
    /// A compiled function. Each instruction lists the cells it refers to;
    /// `None` is an operand that is not a heap reference.
    Bytecode {
        name: String,
        instructions: Vec<Vec<Option<Obj>>>,
    },
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Int(n) => write!(f, "Int({n})"),
            Node::Con { name, args } => write!(f, "Con({name}, {} args)", args.len()),
            Node::Thunk { label, .. } => write!(f, "Thunk({label})"),
            Node::Bytecode { name, instructions } => {
                write!(f, "Bytecode({name}, {} instructions)", instructions.len())
            }
        }
    }
}

/// One mutable heap object. Thunk update and cycle tying write to it in
/// place, so identity survives evaluation.
#[derive(Debug)]
pub struct Cell {
    node: RwLock<Node>,
}

impl Cell {
    pub(crate) fn new(node: Node) -> Obj {
        Arc::new(Self {
            node: RwLock::new(node),
        })
    }

    pub fn node(&self) -> Node {
        self.node.read().clone()
    }

    pub fn is_thunk(&self) -> bool {
        matches!(*self.node.read(), Node::Thunk { .. })
    }

    /// Evaluates the cell if it is a thunk and overwrites it with the
    /// result. Returns whether anything was evaluated.
    pub fn force(&self) -> bool {
        let Node::Thunk {
            label,
            captured,
            code,
        } = self.node()
        else {
            return false;
        };
        // No lock is held while the code runs; it may force other cells.
        let result = code(&captured);
        debug!(%label, ?result, "thunk forced");
        *self.node.write() = result;
        true
    }

    pub(crate) fn set_arg(&self, index: usize, value: Obj) -> Result<(), String> {
        match &mut *self.node.write() {
            Node::Con { name, args } => {
                let arity = args.len();
                let slot = args
                    .get_mut(index)
                    .ok_or_else(|| format!("{name} has {arity} arguments, no argument {index}"))?;
                *slot = value;
                Ok(())
            }
            other => Err(format!("cannot set an argument of {other:?}")),
        }
    }

    /// Field strings and outgoing references as a snapshot sees them.
    pub(crate) fn shape(&self) -> Shape {
        match &*self.node.read() {
            Node::Int(n) => Shape::Fields {
                fields: vec!["I#".to_string(), n.to_string()],
                refs: Vec::new(),
            },
            Node::Con { name, args } => Shape::Fields {
                fields: vec![name.clone()],
                refs: args.clone(),
            },
            Node::Thunk {
                label, captured, ..
            } => Shape::Fields {
                fields: vec!["THUNK".to_string(), label.clone()],
                refs: captured.clone(),
            },
            Node::Bytecode { instructions, .. } => Shape::Bytecode(instructions.clone()),
        }
    }
}

pub(crate) enum Shape {
    Fields { fields: Vec<String>, refs: Vec<Obj> },
    Bytecode(Vec<Vec<Option<Obj>>>),
}
