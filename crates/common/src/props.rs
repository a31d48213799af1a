// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2026 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Typed property documents for persistence and the request surface.
//!
//! Objects serialise as trees of named, type-tagged parameters: every value
//! carries `type=<tag>` and parameters carry `name=<property>`. Object values
//! inline their children recursively; `value_array` holds a heterogeneous
//! list. Each persistable type declares its own property list statically (see
//! the factory module); this module is only the document shape.

use chime_core::serialization::Serializable;
use serde::{Deserialize, Serialize};

/// A typed parameter value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TypedValue {
    /// Boolean value.
    Boolean(bool),
    /// Single character.
    Char(char),
    /// Signed 32-bit integer.
    Int(i32),
    /// Unsigned 32-bit integer.
    Uint(u32),
    /// Signed 64-bit integer.
    Int64(i64),
    /// Unsigned 64-bit integer.
    Uint64(u64),
    /// Signed machine word (persisted cookies).
    Long(i64),
    /// Unsigned machine word.
    Ulong(u64),
    /// Double-precision float.
    Double(f64),
    /// Single-precision float.
    Float(f32),
    /// UTF-8 string.
    String(String),
    /// Nested object, inlined recursively.
    Object(ObjectNode),
    /// Heterogeneous array of values.
    ValueArray(Vec<TypedValue>),
}

impl TypedValue {
    /// Returns the value as `i64` if it carries any signed/unsigned integer.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(i64::from(*v)),
            Self::Uint(v) => Some(i64::from(*v)),
            Self::Int64(v) | Self::Long(v) => Some(*v),
            Self::Uint64(v) | Self::Ulong(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Returns the value as `u64` if it carries a non-negative integer.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Int(v) => u64::try_from(*v).ok(),
            Self::Uint(v) => Some(u64::from(*v)),
            Self::Int64(v) | Self::Long(v) => u64::try_from(*v).ok(),
            Self::Uint64(v) | Self::Ulong(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as `u32` if it carries one in range.
    #[must_use]
    pub fn as_u32(&self) -> Option<u32> {
        self.as_u64().and_then(|v| u32::try_from(v).ok())
    }

    /// Returns the value as `i32` if it carries one in range.
    #[must_use]
    pub fn as_i32(&self) -> Option<i32> {
        self.as_i64().and_then(|v| i32::try_from(v).ok())
    }

    /// Returns the string slice if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the nested object if this is an object value.
    #[must_use]
    pub const fn as_object(&self) -> Option<&ObjectNode> {
        match self {
            Self::Object(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the array items if this is a value array.
    #[must_use]
    pub fn as_array(&self) -> Option<&[TypedValue]> {
        match self {
            Self::ValueArray(v) => Some(v),
            _ => None,
        }
    }
}

/// A named, typed parameter of an object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Property name.
    pub name: String,
    /// Property value with its type tag.
    #[serde(flatten)]
    pub value: TypedValue,
}

/// An object with a class tag and its parameter list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectNode {
    /// Class tag used to instantiate the object on load.
    #[serde(rename = "type")]
    pub class: String,
    /// Declared parameters, in their persisted order.
    #[serde(default)]
    pub parameters: Vec<Property>,
}

impl ObjectNode {
    /// Creates a new [`ObjectNode`] instance.
    #[must_use]
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            parameters: Vec::new(),
        }
    }

    /// Appends a parameter.
    pub fn push(&mut self, name: impl Into<String>, value: TypedValue) {
        self.parameters.push(Property {
            name: name.into(),
            value,
        });
    }

    /// Returns the value of the named parameter, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TypedValue> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }
}

/// The persisted document: the queue's own parameters plus every owned event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Root tag, always `"queue"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Document format version.
    pub version: u32,
    /// Queue parameters.
    #[serde(default)]
    pub parameters: Vec<Property>,
    /// Owned events, pending first.
    #[serde(default)]
    pub children: Vec<ObjectNode>,
}

impl Serializable for Document {}

impl Serializable for ObjectNode {}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_wire_shape_carries_type_and_name() {
        let mut node = ObjectNode::new("event");
        node.push("time", TypedValue::Int64(1_136_073_600));
        node.push("snooze", TypedValue::Uint(10));

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "event");
        assert_eq!(json["parameters"][0]["name"], "time");
        assert_eq!(json["parameters"][0]["type"], "int64");
        assert_eq!(json["parameters"][0]["value"], 1_136_073_600_i64);
        assert_eq!(json["parameters"][1]["type"], "uint");
    }

    #[rstest]
    fn test_value_array_tag() {
        let value = TypedValue::ValueArray(vec![
            TypedValue::String("x".to_string()),
            TypedValue::Boolean(true),
        ]);
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["type"], "value_array");
        assert_eq!(json["value"][1]["type"], "boolean");
    }

    #[rstest]
    fn test_object_nesting_roundtrip() {
        let mut action = ObjectNode::new("action_dialog");
        action.push("flags", TypedValue::Int(9));
        action.push("title", TypedValue::String("Wake".to_string()));

        let mut event = ObjectNode::new("event");
        event.push("action", TypedValue::Object(action));
        event.push("cookie", TypedValue::Long(42));

        let bytes = event.to_json_bytes().unwrap();
        let back = ObjectNode::from_json_bytes(&bytes).unwrap();
        assert_eq!(back, event);
        assert_eq!(
            back.get("action").unwrap().as_object().unwrap().class,
            "action_dialog"
        );
    }

    #[rstest]
    #[case(TypedValue::Int(-3), Some(-3), None)]
    #[case(TypedValue::Uint(7), Some(7), Some(7))]
    #[case(TypedValue::Long(-1), Some(-1), None)]
    #[case(TypedValue::Uint64(u64::MAX), None, Some(u64::MAX))]
    #[case(TypedValue::String(String::new()), None, None)]
    fn test_integer_coercions(
        #[case] value: TypedValue,
        #[case] as_i64: Option<i64>,
        #[case] as_u64: Option<u64>,
    ) {
        assert_eq!(value.as_i64(), as_i64);
        assert_eq!(value.as_u64(), as_u64);
    }

    #[rstest]
    fn test_document_roundtrip() {
        let mut doc = Document {
            kind: "queue".to_string(),
            version: 1,
            parameters: vec![Property {
                name: "snooze".to_string(),
                value: TypedValue::Uint(10),
            }],
            children: Vec::new(),
        };
        doc.children.push(ObjectNode::new("event"));

        let bytes = doc.to_json_bytes().unwrap();
        let back = Document::from_json_bytes(&bytes).unwrap();
        assert_eq!(back, doc);
    }
}
