use std::fmt;
use std::rc::Rc;

use crate::parser::ast::{ConstructorDeclaration, FieldDeclaration, MethodDeclaration, TypeName};
use crate::runner::ds::env::{Binding, EnvNodeRef};
use crate::runner::ds::value::{ClosureRef, VariableRef};

pub type ClassRef = Rc<Class>;

/// An elaborated class. Method and constructor declarations are the rewritten
/// ones; their closures live in `frame` under their descriptors.
pub struct Class {
    pub name: String,
    pub frame: EnvNodeRef,
    pub constructors: Vec<Rc<ConstructorDeclaration>>,
    pub instance_fields: Vec<Rc<FieldDeclaration>>,
    pub instance_methods: Vec<Rc<MethodDeclaration>>,
    pub static_fields: Vec<Rc<FieldDeclaration>>,
    pub static_methods: Vec<Rc<MethodDeclaration>>,
    pub superclass: Option<ClassRef>,
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.superclass {
            Some(s) => write!(f, "Class({} extends {})", self.name, s.name),
            None => write!(f, "Class({})", self.name),
        }
    }
}

/// Where a field was found while walking up from a class.
pub struct FieldInfo {
    pub owner: ClassRef,
    pub field_type: TypeName,
    pub is_static: bool,
}

impl Class {
    /// This class followed by its ancestors, most derived first.
    pub fn lineage(class: &ClassRef) -> Vec<ClassRef> {
        let mut chain = vec![class.clone()];
        let mut cursor = class.superclass.clone();
        while let Some(c) = cursor {
            cursor = c.superclass.clone();
            chain.push(c);
        }
        chain
    }

    pub fn is_subclass_of(class: &ClassRef, ancestor: &str) -> bool {
        Class::lineage(class).iter().any(|c| c.name == ancestor)
    }

    /// Finds the closest declaration of field `name`, static or not.
    pub fn find_field(class: &ClassRef, name: &str) -> Option<FieldInfo> {
        for c in Class::lineage(class) {
            let own = c
                .static_fields
                .iter()
                .map(|f| (f, true))
                .chain(c.instance_fields.iter().map(|f| (f, false)));
            for (field, is_static) in own {
                if field.declarators.iter().any(|d| d.name == name) {
                    return Some(FieldInfo {
                        owner: c.clone(),
                        field_type: field.field_type.clone(),
                        is_static,
                    });
                }
            }
        }
        None
    }

    pub fn has_method_named(class: &ClassRef, name: &str) -> bool {
        Class::lineage(class).iter().any(|c| {
            c.instance_methods
                .iter()
                .chain(c.static_methods.iter())
                .any(|m| m.name == name)
        })
    }

    /// Closure bound under `descriptor` in this class's own frame.
    pub fn own_closure(&self, descriptor: &str) -> Option<ClosureRef> {
        match self.frame.borrow().frame.get(descriptor) {
            Some(Binding::Closure(c)) => Some(c),
            _ => None,
        }
    }

    /// Static field variable bound in this class's own frame.
    pub fn own_variable(&self, name: &str) -> Option<VariableRef> {
        match self.frame.borrow().frame.get(name) {
            Some(Binding::Variable(v)) => Some(v),
            _ => None,
        }
    }
}
