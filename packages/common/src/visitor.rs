use mosaic_parser::ast::*;

/// Visitor pattern for traversing AST nodes immutably
///
/// This trait provides default implementations that walk the entire tree.
/// Override specific visit_* methods to perform custom actions on nodes.
pub trait Visitor: Sized {
    fn visit_document(&mut self, doc: &Document) {
        walk_document(self, doc);
    }

    fn visit_import(&mut self, _import: &ImportDecl) {
        // Leaf node, no children to walk
    }

    fn visit_object(&mut self, object: &ObjectDef) {
        walk_object(self, object);
    }

    fn visit_member(&mut self, member: &Member) {
        walk_member(self, member);
    }
}

// Default walk implementations

pub fn walk_document<V: Visitor>(visitor: &mut V, doc: &Document) {
    for import in &doc.imports {
        visitor.visit_import(import);
    }
    visitor.visit_object(&doc.root);
}

pub fn walk_object<V: Visitor>(visitor: &mut V, object: &ObjectDef) {
    for member in &object.members {
        visitor.visit_member(member);
    }
}

pub fn walk_member<V: Visitor>(visitor: &mut V, member: &Member) {
    match member {
        Member::Object { object, .. } | Member::Child(object) => {
            visitor.visit_object(object);
        }
        Member::Array { objects, .. } => {
            for object in objects {
                visitor.visit_object(object);
            }
        }
        Member::Id { .. } | Member::Script { .. } | Member::Signal { .. } => {
            // Leaf members
        }
    }
}

/// Find the object definition starting at a byte offset
pub fn find_object_at(doc: &Document, offset: usize) -> Option<&ObjectDef> {
    struct Locator<'a> {
        offset: usize,
        found: Option<&'a ObjectDef>,
    }

    impl<'a> Locator<'a> {
        fn visit(&mut self, object: &'a ObjectDef) {
            if self.found.is_some() || !object.span.contains(self.offset) {
                return;
            }
            if object.span.start == self.offset {
                self.found = Some(object);
                return;
            }
            for member in &object.members {
                match member {
                    Member::Object { object, .. } | Member::Child(object) => self.visit(object),
                    Member::Array { objects, .. } => {
                        for object in objects {
                            self.visit(object);
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    let mut locator = Locator {
        offset,
        found: None,
    };
    locator.visit(&doc.root);
    locator.found
}
