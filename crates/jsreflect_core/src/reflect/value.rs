//! Values of the reflected AST and the allocation capability that builds
//! them.
//!
//! [`AstValue`] is the immutable, reference-counted result graph handed back
//! to callers.  Objects and arrays are assembled on mutable
//! [`ObjectBuilder`] / [`ArrayBuilder`] values obtained from an [`AstHeap`],
//! then frozen with `finish`.  The heap counts every allocation and, when a
//! budget is configured, fails with [`ReflectError::OutOfMemory`] once the
//! budget is spent.

use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use smallvec::SmallVec;

use crate::error::{ReflectError, ReflectResult};

// ─────────────────────────────────────────────────────────────────────────────
// AstValue
// ─────────────────────────────────────────────────────────────────────────────

/// A value in the reflected AST.
#[derive(Debug, Clone, PartialEq)]
pub enum AstValue {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(Rc<str>),
    /// A regular-expression literal.
    RegExp(Rc<RegExpValue>),
    Object(Rc<AstObject>),
    Array(Rc<AstArray>),
}

/// Source and flags of a regular-expression literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegExpValue {
    pub source: Rc<str>,
    pub flags: Rc<str>,
}

impl fmt::Display for RegExpValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.source, self.flags)
    }
}

impl AstValue {
    pub fn is_null(&self) -> bool {
        matches!(self, AstValue::Null)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, AstValue::Undefined)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AstValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            AstValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AstValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&AstObject> {
        match self {
            AstValue::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&AstArray> {
        match self {
            AstValue::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Field lookup on an object value; `None` for non-objects and missing
    /// fields.
    pub fn get(&self, name: &str) -> Option<&AstValue> {
        self.as_object().and_then(|o| o.get(name))
    }

    /// The `type` tag of a node value.
    pub fn node_type(&self) -> Option<&str> {
        self.get("type").and_then(AstValue::as_str)
    }

    /// Render as a `serde_json::Value`.  Holes become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Serialize for AstValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AstValue::Undefined | AstValue::Null => serializer.serialize_unit(),
            AstValue::Boolean(b) => serializer.serialize_bool(*b),
            AstValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 && !(*n == 0.0 && n.is_sign_negative()) {
                    serializer.serialize_i64(*n as i64)
                } else {
                    serializer.serialize_f64(*n)
                }
            }
            AstValue::String(s) => serializer.serialize_str(s),
            AstValue::RegExp(re) => serializer.collect_str(re),
            AstValue::Object(o) => o.serialize(serializer),
            AstValue::Array(a) => a.serialize(serializer),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Objects and arrays
// ─────────────────────────────────────────────────────────────────────────────

/// An object with fields in insertion order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AstObject {
    fields: SmallVec<[(Rc<str>, AstValue); 8]>,
}

impl AstObject {
    pub fn get(&self, name: &str) -> Option<&AstValue> {
        self.fields.iter().find(|(k, _)| &**k == name).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| &**k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AstValue)> {
        self.fields.iter().map(|(k, v)| (&**k, v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for AstObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(&**k, v)?;
        }
        map.end()
    }
}

/// A sparse array; `None` slots are holes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AstArray {
    elements: Vec<Option<AstValue>>,
}

impl AstArray {
    /// The element at `index`, or `None` for a hole or an index past the
    /// end.
    pub fn get(&self, index: usize) -> Option<&AstValue> {
        self.elements.get(index).and_then(Option::as_ref)
    }

    pub fn is_hole(&self, index: usize) -> bool {
        matches!(self.elements.get(index), Some(None))
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&AstValue>> {
        self.elements.iter().map(Option::as_ref)
    }
}

impl Serialize for AstArray {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.elements.len()))?;
        for element in &self.elements {
            seq.serialize_element(element)?;
        }
        seq.end()
    }
}

/// An object under construction.
#[derive(Debug, Default)]
pub struct ObjectBuilder {
    fields: SmallVec<[(Rc<str>, AstValue); 8]>,
}

impl ObjectBuilder {
    pub fn finish(self) -> AstValue {
        AstValue::Object(Rc::new(AstObject { fields: self.fields }))
    }
}

/// An array under construction.
#[derive(Debug, Default)]
pub struct ArrayBuilder {
    elements: Vec<Option<AstValue>>,
}

impl ArrayBuilder {
    pub fn finish(self) -> AstValue {
        AstValue::Array(Rc::new(AstArray {
            elements: self.elements,
        }))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MaybeNode
// ─────────────────────────────────────────────────────────────────────────────

/// An optional child: either a value or "no node".
///
/// "No node" never reaches the output.  It collapses differently depending
/// on where it is stored, through three separate conversions.
#[derive(Debug, Clone, PartialEq)]
pub enum MaybeNode {
    Node(AstValue),
    NoNode,
}

impl MaybeNode {
    /// Collapse for an object field: no node becomes `null`.
    pub fn into_field(self) -> AstValue {
        match self {
            MaybeNode::Node(v) => v,
            MaybeNode::NoNode => AstValue::Null,
        }
    }

    /// Collapse for a list slot: no node becomes a hole.
    pub fn into_element(self) -> Option<AstValue> {
        match self {
            MaybeNode::Node(v) => Some(v),
            MaybeNode::NoNode => None,
        }
    }

    /// Collapse for an override callback argument: no node becomes
    /// `undefined`.
    pub fn into_callback_arg(self) -> AstValue {
        match self {
            MaybeNode::Node(v) => v,
            MaybeNode::NoNode => AstValue::Undefined,
        }
    }

    pub fn is_no_node(&self) -> bool {
        matches!(self, MaybeNode::NoNode)
    }
}

impl From<AstValue> for MaybeNode {
    fn from(value: AstValue) -> Self {
        MaybeNode::Node(value)
    }
}

impl From<Option<AstValue>> for MaybeNode {
    fn from(value: Option<AstValue>) -> Self {
        value.map_or(MaybeNode::NoNode, MaybeNode::Node)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AstHeap
// ─────────────────────────────────────────────────────────────────────────────

/// The allocation capability used to build result values.
#[derive(Debug, Default)]
pub struct AstHeap {
    strings: HashSet<Rc<str>>,
    allocations: usize,
    budget: Option<usize>,
}

impl AstHeap {
    pub fn new() -> Self {
        Self::default()
    }

    /// A heap that fails with `OutOfMemory` after `budget` allocations.
    pub fn with_budget(budget: Option<usize>) -> Self {
        Self {
            budget,
            ..Self::default()
        }
    }

    /// Number of allocations made so far.
    pub fn allocations(&self) -> usize {
        self.allocations
    }

    fn charge(&mut self) -> ReflectResult<()> {
        self.allocations += 1;
        match self.budget {
            Some(budget) if self.allocations > budget => Err(ReflectError::OutOfMemory),
            _ => Ok(()),
        }
    }

    pub fn new_object(&mut self) -> ReflectResult<ObjectBuilder> {
        self.charge()?;
        Ok(ObjectBuilder::default())
    }

    /// A new array of `len` holes.
    pub fn new_array(&mut self, len: usize) -> ReflectResult<ArrayBuilder> {
        self.charge()?;
        let mut elements = Vec::new();
        elements
            .try_reserve_exact(len)
            .map_err(|_| ReflectError::OutOfMemory)?;
        elements.resize(len, None);
        Ok(ArrayBuilder { elements })
    }

    /// Set (or replace) a field.  Field names are interned.
    pub fn set_field(
        &mut self,
        obj: &mut ObjectBuilder,
        name: &str,
        value: AstValue,
    ) -> ReflectResult<()> {
        if let Some(slot) = obj.fields.iter_mut().find(|(k, _)| &**k == name) {
            slot.1 = value;
            return Ok(());
        }
        let name = self.intern_string(name)?;
        obj.fields.push((name, value));
        Ok(())
    }

    /// Set element `index`; `None` leaves a hole.  The array grows as
    /// needed.
    pub fn set_element(
        &mut self,
        arr: &mut ArrayBuilder,
        index: usize,
        value: Option<AstValue>,
    ) -> ReflectResult<()> {
        if index >= arr.elements.len() {
            arr.elements.resize(index + 1, None);
        }
        arr.elements[index] = value;
        Ok(())
    }

    /// The shared copy of `s`.  Equal strings share one allocation.
    pub fn intern_string(&mut self, s: &str) -> ReflectResult<Rc<str>> {
        if let Some(existing) = self.strings.get(s) {
            return Ok(Rc::clone(existing));
        }
        self.charge()?;
        let rc: Rc<str> = Rc::from(s);
        self.strings.insert(Rc::clone(&rc));
        Ok(rc)
    }

    /// `intern_string`, wrapped as a string value.
    pub fn string(&mut self, s: &str) -> ReflectResult<AstValue> {
        self.intern_string(s).map(AstValue::String)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_fields_keep_insertion_order() {
        let mut heap = AstHeap::new();
        let mut obj = heap.new_object().unwrap();
        heap.set_field(&mut obj, "type", AstValue::Null).unwrap();
        heap.set_field(&mut obj, "body", AstValue::Boolean(true)).unwrap();
        heap.set_field(&mut obj, "loc", AstValue::Null).unwrap();
        heap.set_field(&mut obj, "type", AstValue::Number(1.0)).unwrap();
        let value = obj.finish();
        let keys: Vec<_> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["type", "body", "loc"]);
        assert_eq!(value.get("type"), Some(&AstValue::Number(1.0)));
    }

    #[test]
    fn test_array_holes() {
        let mut heap = AstHeap::new();
        let mut arr = heap.new_array(3).unwrap();
        heap.set_element(&mut arr, 0, Some(AstValue::Number(1.0))).unwrap();
        heap.set_element(&mut arr, 2, Some(AstValue::Number(3.0))).unwrap();
        let value = arr.finish();
        let arr = value.as_array().unwrap();
        assert_eq!(arr.len(), 3);
        assert!(arr.is_hole(1));
        assert!(!arr.is_hole(0));
        assert_eq!(arr.get(1), None);
    }

    #[test]
    fn test_set_element_grows() {
        let mut heap = AstHeap::new();
        let mut arr = heap.new_array(0).unwrap();
        heap.set_element(&mut arr, 2, Some(AstValue::Null)).unwrap();
        let value = arr.finish();
        assert_eq!(value.as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_interning_shares_allocation() {
        let mut heap = AstHeap::new();
        let a = heap.intern_string("Identifier").unwrap();
        let b = heap.intern_string("Identifier").unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(heap.allocations(), 1);
    }

    #[test]
    fn test_budget_exhaustion() {
        let mut heap = AstHeap::with_budget(Some(2));
        assert!(heap.new_object().is_ok());
        assert!(heap.new_array(1).is_ok());
        assert_eq!(heap.new_object().unwrap_err(), ReflectError::OutOfMemory);
    }

    #[test]
    fn test_no_node_collapses_per_destination() {
        assert_eq!(MaybeNode::NoNode.into_field(), AstValue::Null);
        assert_eq!(MaybeNode::NoNode.into_element(), None);
        assert_eq!(MaybeNode::NoNode.into_callback_arg(), AstValue::Undefined);
        let node = MaybeNode::from(AstValue::Boolean(true));
        assert_eq!(node.clone().into_field(), AstValue::Boolean(true));
        assert_eq!(node.clone().into_element(), Some(AstValue::Boolean(true)));
        assert_eq!(node.into_callback_arg(), AstValue::Boolean(true));
    }

    #[test]
    fn test_json_rendering() {
        let mut heap = AstHeap::new();
        let mut arr = heap.new_array(3).unwrap();
        heap.set_element(&mut arr, 0, Some(AstValue::Number(1.0))).unwrap();
        heap.set_element(&mut arr, 2, Some(AstValue::Number(2.5))).unwrap();
        let re = AstValue::RegExp(Rc::new(RegExpValue {
            source: Rc::from("a+"),
            flags: Rc::from("gi"),
        }));
        let mut obj = heap.new_object().unwrap();
        heap.set_field(&mut obj, "elements", arr.finish()).unwrap();
        heap.set_field(&mut obj, "value", re).unwrap();
        let json = serde_json::to_string(&obj.finish()).unwrap();
        assert_eq!(json, r#"{"elements":[1,null,2.5],"value":"/a+/gi"}"#);
    }
}
