//! # Refactoring
//!
//! Grammar-aware text editing primitives. Every primitive takes byte offsets
//! of objects in the current text, re-parses the text to find the object that
//! starts there, and edits around it while preserving everything it does not
//! touch. Each returns `false` when the offsets no longer resolve to the
//! expected shape.
//!
//! Tracked node offsets are updated after every edit, so the offsets a caller
//! reads from the [`PositionStore`] stay valid between calls.

use crate::config::SyncConfig;
use crate::indenter;
use crate::model::{Import, PropertyKind};
use crate::positions::{PositionRecalculator, PositionStore};
use crate::render::{array_text, indent_lines, member_text};
use crate::text_modifier::{MoveInfo, TextModifier};
use mosaic_common::find_object_at;
use mosaic_parser::ast::{Document, ImportDecl, Member, ObjectDef, Span};
use mosaic_parser::{parse, ParseError};
use std::ops::Range;
use std::rc::Rc;

/// Where an object sits inside its parent
#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Child,
    Binding {
        member: Span,
    },
    Element {
        name: String,
        index: usize,
        count: usize,
        member: Span,
        previous_end: Option<usize>,
        next_start: Option<usize>,
    },
}

struct Located<'d> {
    object: &'d ObjectDef,
    parent: &'d ObjectDef,
    slot: Slot,
}

fn locate(object: &ObjectDef, offset: usize) -> Option<Located<'_>> {
    for member in &object.members {
        match member {
            Member::Child(child) => {
                if child.span.start == offset {
                    return Some(Located {
                        object: child,
                        parent: object,
                        slot: Slot::Child,
                    });
                }
                if child.span.contains(offset) {
                    return locate(child, offset);
                }
            }
            Member::Object {
                object: child, span, ..
            } => {
                if child.span.start == offset {
                    return Some(Located {
                        object: child,
                        parent: object,
                        slot: Slot::Binding { member: *span },
                    });
                }
                if child.span.contains(offset) {
                    return locate(child, offset);
                }
            }
            Member::Array {
                name,
                objects,
                span,
                ..
            } => {
                for (index, child) in objects.iter().enumerate() {
                    if child.span.start == offset {
                        return Some(Located {
                            object: child,
                            parent: object,
                            slot: Slot::Element {
                                name: name.clone(),
                                index,
                                count: objects.len(),
                                member: *span,
                                previous_end: index.checked_sub(1).map(|i| objects[i].span.end),
                                next_start: objects.get(index + 1).map(|o| o.span.start),
                            },
                        });
                    }
                    if child.span.contains(offset) {
                        return locate(child, offset);
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// Ordering class of a member inside an object body
fn member_rank(member: &Member) -> u8 {
    match member {
        Member::Id { .. } => 0,
        Member::Signal { .. } => 1,
        Member::Script { .. } => 2,
        Member::Object { .. } | Member::Array { .. } => 3,
        Member::Child(_) => 4,
    }
}

fn import_matches(decl: &ImportDecl, import: &Import) -> bool {
    decl.target == import.target && decl.version == import.version && decl.alias == import.alias
}

fn line_start(text: &str, offset: usize) -> usize {
    text[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0)
}

/// Leading whitespace of the line containing `offset`
fn line_indent(text: &str, offset: usize) -> String {
    let start = line_start(text, offset);
    text[start..]
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .collect()
}

fn first_on_line(text: &str, offset: usize) -> bool {
    text[line_start(text, offset)..offset].trim().is_empty()
}

fn skip_blanks(bytes: &[u8], mut index: usize) -> usize {
    while index < bytes.len() && (bytes[index] == b' ' || bytes[index] == b'\t') {
        index += 1;
    }
    index
}

/// Region to delete when removing the member at `span`: whole lines when the
/// member stands alone on its line, otherwise the member plus its separator
fn removal_range(text: &str, span: Span) -> Range<usize> {
    let bytes = text.as_bytes();
    let start_of_line = line_start(text, span.start);

    let mut stop = skip_blanks(bytes, span.end);
    if stop < bytes.len() && bytes[stop] == b';' {
        stop = skip_blanks(bytes, stop + 1);
    }

    if text[start_of_line..span.start].trim().is_empty() {
        if stop == bytes.len() {
            return start_of_line.saturating_sub(1)..stop;
        }
        if bytes[stop] == b'\n' {
            return start_of_line..stop + 1;
        }
        return span.start..stop;
    }

    let mut from = span.start;
    while from > start_of_line && (bytes[from - 1] == b' ' || bytes[from - 1] == b'\t') {
        from -= 1;
    }
    from..stop
}

/// Offset after a `replaced(offset, old, new)` edit
fn shifted(p: usize, offset: usize, old_length: usize, new_length: usize) -> usize {
    if p >= offset + old_length && p > offset {
        p - old_length + new_length
    } else {
        p
    }
}

/// Grammar-aware editor over a [`TextModifier`]
pub struct Refactoring<'a> {
    modifier: &'a mut dyn TextModifier,
    positions: &'a mut PositionStore,
    recalculator: &'a mut PositionRecalculator,
    indent_width: usize,
    default_property: String,
    document: Option<(u64, Rc<Document>)>,
}

impl<'a> Refactoring<'a> {
    pub fn new(
        modifier: &'a mut dyn TextModifier,
        positions: &'a mut PositionStore,
        recalculator: &'a mut PositionRecalculator,
        config: &SyncConfig,
    ) -> Self {
        Self {
            modifier,
            positions,
            recalculator,
            indent_width: config.indent_width,
            default_property: config.default_property.clone(),
            document: None,
        }
    }

    pub fn text(&self) -> &str {
        self.modifier.text()
    }

    pub fn indent_width(&self) -> usize {
        self.indent_width
    }

    pub fn positions(&self) -> &PositionStore {
        self.positions
    }

    pub fn positions_mut(&mut self) -> &mut PositionStore {
        self.positions
    }

    /// Parse the current text, reusing the last parse if nothing changed
    pub fn reparse(&mut self) -> Result<Rc<Document>, ParseError> {
        let revision = self.modifier.revision();
        if let Some((cached, document)) = &self.document {
            if *cached == revision {
                return Ok(Rc::clone(document));
            }
        }
        let document = Rc::new(parse(self.modifier.text())?);
        self.document = Some((revision, Rc::clone(&document)));
        Ok(document)
    }

    pub fn reparse_document(&mut self) -> bool {
        self.reparse().is_ok()
    }

    /// Push batched edits to the buffer and check the result still parses
    pub fn flush(&mut self) -> bool {
        self.modifier.flush_group();
        self.reparse_document()
    }

    fn unit(&self) -> String {
        " ".repeat(self.indent_width)
    }

    fn is_default(&self, name: &str) -> bool {
        name == self.default_property
    }

    fn rank(&self, name: &str, kind: PropertyKind) -> u8 {
        match kind {
            PropertyKind::SignalDeclaration => 1,
            PropertyKind::Variant | PropertyKind::Binding | PropertyKind::SignalHandler => 2,
            PropertyKind::NodeList if self.is_default(name) => 4,
            PropertyKind::Node | PropertyKind::NodeList => 3,
        }
    }

    fn sync_positions(&mut self) {
        for event in self.modifier.take_events() {
            self.recalculator.text_event(&event, self.positions);
        }
    }

    fn replace(&mut self, offset: usize, length: usize, text: &str) -> bool {
        let done = self.modifier.replace(offset, length, text);
        self.sync_positions();
        done
    }

    fn replace_range(&mut self, range: Range<usize>, text: &str) -> bool {
        self.replace(range.start, range.end - range.start, text)
    }

    fn move_block(&mut self, info: &MoveInfo) -> bool {
        let done = self.modifier.move_block(info);
        self.sync_positions();
        done
    }

    /// Indentation for a new member of `owner`
    fn member_indent(&self, owner: &ObjectDef) -> String {
        let text = self.text();
        owner
            .members
            .iter()
            .map(|member| member.span().start)
            .find(|start| first_on_line(text, *start))
            .map(|start| line_indent(text, start))
            .unwrap_or_else(|| line_indent(text, owner.span.start) + &self.unit())
    }

    /// Where a member of the given rank goes: after the last member of equal
    /// or lower rank (skipping members inside `exclude`), or right after the
    /// opening brace. The flag is set when a line break must follow.
    fn insertion_point(&self, owner: &ObjectDef, rank: u8, exclude: Option<&Range<usize>>) -> (usize, bool) {
        let anchor = owner
            .members
            .iter()
            .filter(|member| member_rank(member) <= rank)
            .filter(|member| {
                exclude
                    .map(|range| {
                        let span = member.span();
                        span.end <= range.start || span.start >= range.end
                    })
                    .unwrap_or(true)
            })
            .last();

        match anchor {
            Some(member) => (member.span().end, false),
            None => {
                let text = self.text();
                let after = owner.lbrace() + 1;
                let rest = &text[after..];
                let next = rest.trim_start_matches([' ', '\t']).chars().next();
                (after, !matches!(next, Some('\n') | Some('\r') | Some('}') | None))
            }
        }
    }

    /// Turn a same-line empty body (`Type {}`) into an open one. Returns the
    /// edit so callers can adjust offsets they hold.
    fn open_empty_body(&mut self, owner_offset: usize) -> Option<(usize, usize, usize)> {
        let document = self.reparse().ok()?;
        let owner = find_object_at(&document, owner_offset)?;
        let (lbrace, rbrace) = (owner.lbrace(), owner.rbrace());
        if !owner.members.is_empty() || self.text()[lbrace..rbrace].contains('\n') {
            return None;
        }
        let body = format!("\n{}", line_indent(self.text(), owner.span.start));
        let length = rbrace - (lbrace + 1);
        if self.replace(lbrace + 1, length, &body) {
            Some((lbrace + 1, length, body.len()))
        } else {
            None
        }
    }

    /// Insert a member of `owner`; returns the offset where its text starts
    fn insert_member(&mut self, owner_offset: usize, rank: u8, text: &str) -> Option<usize> {
        self.open_empty_body(owner_offset);
        let document = self.reparse().ok()?;
        let owner = find_object_at(&document, owner_offset)?;

        let indent = self.member_indent(owner);
        let (at, break_after) = self.insertion_point(owner, rank, None);
        let mut insertion = format!("\n{}{}", indent, indent_lines(text, &indent));
        if break_after {
            insertion.push('\n');
            insertion.push_str(&indent);
        }
        if self.replace(at, 0, &insertion) {
            Some(at + 1 + indent.len())
        } else {
            None
        }
    }

    /// Add a property, or change it if the member already exists
    pub fn add_property(&mut self, owner: usize, name: &str, value: &str, kind: PropertyKind) -> bool {
        if self.is_default(name) {
            return self.add_to_object_member_list(owner, value, None);
        }
        let Ok(document) = self.reparse() else {
            return false;
        };
        let Some(object) = find_object_at(&document, owner) else {
            return false;
        };
        if object.member(name).is_some() {
            return self.change_property(owner, name, value, kind);
        }
        let rank = self.rank(name, kind);
        self.insert_member(owner, rank, &member_text(name, value, kind))
            .is_some()
    }

    /// Replace a property's value, adding the member if it is missing
    pub fn change_property(&mut self, owner: usize, name: &str, value: &str, kind: PropertyKind) -> bool {
        let Ok(document) = self.reparse() else {
            return false;
        };
        let Some(object) = find_object_at(&document, owner) else {
            return false;
        };
        let Some(member) = object.member(name) else {
            return self.add_property(owner, name, value, kind);
        };

        let indent = line_indent(self.text(), member.span().start);
        let (span, replacement) = match (member, kind) {
            (
                Member::Script { value_span, .. },
                PropertyKind::Variant | PropertyKind::Binding | PropertyKind::SignalHandler,
            ) => (*value_span, value.to_string()),
            (Member::Object { object, .. }, PropertyKind::Node) => (object.span, value.to_string()),
            (Member::Array { brackets, .. }, PropertyKind::NodeList) => (*brackets, value.to_string()),
            (member, kind) => (member.span(), member_text(name, value, kind)),
        };
        self.replace(span.start, span.len(), &indent_lines(&replacement, &indent))
    }

    pub fn remove_property(&mut self, owner: usize, name: &str) -> bool {
        let Ok(document) = self.reparse() else {
            return false;
        };
        let Some(object) = find_object_at(&document, owner) else {
            return false;
        };

        if self.is_default(name) {
            let spans: Vec<Span> = object.children().map(|child| child.span).collect();
            if spans.is_empty() {
                return false;
            }
            let ranges: Vec<Range<usize>> = spans
                .iter()
                .map(|span| removal_range(self.text(), *span))
                .collect();
            return ranges.into_iter().rev().all(|range| self.replace_range(range, ""));
        }

        match object.member(name) {
            Some(member) => {
                let range = removal_range(self.text(), member.span());
                self.replace_range(range, "")
            }
            None => false,
        }
    }

    /// Add, change or remove the `id` member
    pub fn set_id(&mut self, owner: usize, id: Option<&str>) -> bool {
        let Ok(document) = self.reparse() else {
            return false;
        };
        let Some(object) = find_object_at(&document, owner) else {
            return false;
        };

        match (object.member("id"), id) {
            (Some(Member::Id { value_span, .. }), Some(id)) => {
                self.replace(value_span.start, value_span.len(), id)
            }
            (Some(member), None) => {
                let range = removal_range(self.text(), member.span());
                self.replace_range(range, "")
            }
            (Some(_), Some(_)) => false,
            (None, Some(id)) => self.insert_member(owner, 0, &format!("id: {}", id)).is_some(),
            (None, None) => true,
        }
    }

    /// Insert a child object before the child at `before`, or after the
    /// last child
    pub fn add_to_object_member_list(&mut self, owner: usize, object: &str, before: Option<usize>) -> bool {
        let Ok(document) = self.reparse() else {
            return false;
        };
        let Some(parent) = find_object_at(&document, owner) else {
            return false;
        };

        let sibling = before.and_then(|b| parent.children().find(|child| child.span.start == b));
        match sibling {
            Some(sibling) => {
                let at = sibling.span.start;
                let text = self.text();
                let insertion = if first_on_line(text, at) {
                    let indent = line_indent(text, at);
                    format!("{}\n{}", indent_lines(object, &indent), indent)
                } else {
                    format!("{}; ", object)
                };
                self.replace(at, 0, &insertion)
            }
            None => self.insert_member(owner, 4, object).is_some(),
        }
    }

    /// Insert an element into a list property, creating the member if needed
    pub fn add_to_array_member_list(
        &mut self,
        owner: usize,
        name: &str,
        object: &str,
        before: Option<usize>,
    ) -> bool {
        let Ok(document) = self.reparse() else {
            return false;
        };
        let Some(parent) = find_object_at(&document, owner) else {
            return false;
        };

        let objects = match parent.member(name) {
            Some(Member::Array { objects, .. }) => objects,
            Some(_) => return false,
            None => {
                let array = array_text(object, &self.unit());
                return self.add_property(owner, name, &array, PropertyKind::NodeList);
            }
        };

        let text = self.text();
        let sibling = before.and_then(|b| objects.iter().find(|o| o.span.start == b));
        let (at, insertion) = match (sibling, objects.last()) {
            (Some(sibling), _) => {
                let at = sibling.span.start;
                if first_on_line(text, at) {
                    let indent = line_indent(text, at);
                    (at, format!("{},\n{}", indent_lines(object, &indent), indent))
                } else {
                    (at, format!("{}, ", object))
                }
            }
            (None, Some(last)) => {
                let at = last.span.end;
                if first_on_line(text, last.span.start) {
                    let indent = line_indent(text, last.span.start);
                    (at, format!(",\n{}{}", indent, indent_lines(object, &indent)))
                } else {
                    (at, format!(", {}", object))
                }
            }
            (None, None) => return false,
        };
        self.replace(at, 0, &insertion)
    }

    pub fn change_object_type(&mut self, object: usize, type_name: &str) -> bool {
        let Ok(document) = self.reparse() else {
            return false;
        };
        match find_object_at(&document, object) {
            Some(found) => self.replace(found.type_span.start, found.type_span.len(), type_name),
            None => false,
        }
    }

    /// Region removed when the object at `offset` leaves its parent
    fn detach_range(located: &Located<'_>, text: &str) -> Range<usize> {
        let span = located.object.span;
        match &located.slot {
            Slot::Child => removal_range(text, span),
            Slot::Binding { member } => removal_range(text, *member),
            Slot::Element { count: 1, member, .. } => removal_range(text, *member),
            Slot::Element {
                next_start: Some(next),
                ..
            } => span.start..*next,
            Slot::Element {
                previous_end: Some(previous),
                ..
            } => *previous..span.end,
            Slot::Element { .. } => span.start..span.end,
        }
    }

    /// Remove an object. The last element of a list or an object binding
    /// takes its whole member with it. The root cannot be removed.
    pub fn remove_object(&mut self, object: usize) -> bool {
        let Ok(document) = self.reparse() else {
            return false;
        };
        let Some(located) = locate(&document.root, object) else {
            return false;
        };
        let range = Self::detach_range(&located, self.text());
        self.replace_range(range, "")
    }

    /// Move an object into `property` of the object at `target`, before the
    /// sibling at `before` when given
    pub fn move_object(
        &mut self,
        object: usize,
        target: usize,
        property: &str,
        kind: PropertyKind,
        before: Option<usize>,
    ) -> bool {
        let (mut object, mut before) = (object, before);
        if let Some((at, old, new)) = self.open_empty_body(target) {
            object = shifted(object, at, old, new);
            before = before.map(|b| shifted(b, at, old, new));
        }

        let Ok(document) = self.reparse() else {
            return false;
        };
        let Some(located) = locate(&document.root, object) else {
            return false;
        };
        let Some(owner) = find_object_at(&document, target) else {
            return false;
        };

        let text = self.text();
        let removed = Self::detach_range(&located, text);
        let span = located.object.span;
        let indent = self.member_indent(owner);
        let unit = self.unit();

        let (destination, prefix, suffix) = if self.is_default(property) {
            let sibling = before.and_then(|b| owner.children().find(|child| child.span.start == b));
            match sibling {
                Some(sibling) => {
                    let at = sibling.span.start;
                    if first_on_line(text, at) {
                        (at, String::new(), format!("\n{}", line_indent(text, at)))
                    } else {
                        (at, String::new(), "; ".to_string())
                    }
                }
                None => {
                    let (at, break_after) = self.insertion_point(owner, 4, Some(&removed));
                    let suffix = if break_after { format!("\n{}", indent) } else { String::new() };
                    (at, format!("\n{}", indent), suffix)
                }
            }
        } else {
            match (kind, owner.member(property)) {
                (PropertyKind::Node, None) => {
                    let (at, break_after) = self.insertion_point(owner, 3, Some(&removed));
                    let suffix = if break_after { format!("\n{}", indent) } else { String::new() };
                    (at, format!("\n{}{}: ", indent, property), suffix)
                }
                (PropertyKind::NodeList, Some(Member::Array { objects, .. })) => {
                    let sibling = before.and_then(|b| objects.iter().find(|o| o.span.start == b));
                    match (sibling, objects.last()) {
                        (Some(sibling), _) => {
                            let at = sibling.span.start;
                            if first_on_line(text, at) {
                                (at, String::new(), format!(",\n{}", line_indent(text, at)))
                            } else {
                                (at, String::new(), ", ".to_string())
                            }
                        }
                        (None, Some(last)) => {
                            if first_on_line(text, last.span.start) {
                                let element_indent = line_indent(text, last.span.start);
                                (last.span.end, format!(",\n{}", element_indent), String::new())
                            } else {
                                (last.span.end, ", ".to_string(), String::new())
                            }
                        }
                        (None, None) => return false,
                    }
                }
                (PropertyKind::NodeList, None) => {
                    let (at, break_after) = self.insertion_point(owner, 3, Some(&removed));
                    let mut suffix = format!("\n{}]", indent);
                    if break_after {
                        suffix.push('\n');
                        suffix.push_str(&indent);
                    }
                    (at, format!("\n{}{}: [\n{}{}", indent, property, indent, unit), suffix)
                }
                _ => return false,
            }
        };

        if destination > removed.start && destination < removed.end {
            return false;
        }

        let info = MoveInfo {
            object_start: span.start,
            object_end: span.end,
            leading_chars_to_remove: span.start - removed.start,
            trailing_chars_to_remove: removed.end - span.end,
            destination,
            prefix_to_insert: prefix,
            suffix_to_insert: suffix,
        };
        self.move_block(&info)
    }

    /// Reorder an object within its own list, before the sibling at `before`
    /// or to the end
    pub fn move_object_before_object(&mut self, object: usize, before: Option<usize>) -> bool {
        let Ok(document) = self.reparse() else {
            return false;
        };
        let Some(located) = locate(&document.root, object) else {
            return false;
        };

        let (property, next) = match &located.slot {
            Slot::Child => {
                let next = located
                    .parent
                    .children()
                    .map(|child| child.span.start)
                    .find(|start| *start > object);
                (self.default_property.clone(), next)
            }
            Slot::Element { name, next_start, .. } => (name.clone(), *next_start),
            Slot::Binding { .. } => return false,
        };

        if next == before {
            return true;
        }
        let parent = located.parent.span.start;
        self.move_object(object, parent, &property, PropertyKind::NodeList, before)
    }

    /// Offsets of the elements of a list property, in text order
    pub fn list_offsets(&mut self, owner: usize, property: &str) -> Vec<usize> {
        let Ok(document) = self.reparse() else {
            return Vec::new();
        };
        let Some(object) = find_object_at(&document, owner) else {
            return Vec::new();
        };
        if self.is_default(property) {
            return object.children().map(|child| child.span.start).collect();
        }
        match object.member(property) {
            Some(Member::Array { objects, .. }) => objects.iter().map(|o| o.span.start).collect(),
            Some(Member::Object { object, .. }) => vec![object.span.start],
            _ => Vec::new(),
        }
    }

    pub fn add_import(&mut self, import: &Import) -> bool {
        let Ok(document) = self.reparse() else {
            return false;
        };
        if document.imports.iter().any(|decl| import_matches(decl, import)) {
            return true;
        }
        match document.imports.last() {
            Some(last) => self.replace(last.span.end, 0, &format!("\n{}", import.to_source())),
            None => self.replace(0, 0, &format!("{}\n\n", import.to_source())),
        }
    }

    pub fn remove_import(&mut self, import: &Import) -> bool {
        let Ok(document) = self.reparse() else {
            return false;
        };
        match document.imports.iter().find(|decl| import_matches(decl, import)) {
            Some(decl) => {
                let range = removal_range(self.text(), decl.span);
                self.replace_range(range, "")
            }
            None => false,
        }
    }

    /// Re-indent the lines touched by `ranges`, or every line
    pub fn reindent(&mut self, ranges: Option<&[Range<usize>]>) -> bool {
        let edits = indenter::reindent(self.text(), ranges, &self.unit());
        edits
            .iter()
            .rev()
            .all(|edit| self.replace(edit.offset, edit.length, &edit.indent))
    }
}
