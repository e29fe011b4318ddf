//! Context configurations: named table views and named forms.
//!
//! A table context is a read surface made of column bindings. A form context
//! is an ordered list of sections whose content is either explicit field
//! bindings or group references expanded from the registry at resolution
//! time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::rule::ConditionalRule;
use crate::types::{roles, PermissionConfig, RoleSet};

fn default_true() -> bool {
    true
}

fn default_page_size() -> u32 {
    25
}

/// Horizontal alignment of a table column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Default sort of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct SortSpec {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

/// One column of a table context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnBinding {
    pub field: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default)]
    pub sortable: bool,
    #[serde(default)]
    pub filterable: bool,
    #[serde(default)]
    pub align: Alignment,
    #[serde(default)]
    pub sticky: bool,
    /// Explicit position; declaration order when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
}

impl ColumnBinding {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            visible: true,
            width: None,
            sortable: false,
            filterable: false,
            align: Alignment::default(),
            sticky: false,
            order: None,
        }
    }

    pub fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    pub fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    pub fn align(mut self, align: Alignment) -> Self {
        self.align = align;
        self
    }

    pub fn sticky(mut self) -> Self {
        self.sticky = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn order(mut self, order: u32) -> Self {
        self.order = Some(order);
        self
    }
}

/// View and export roles of a table. Tables have no edit concept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TablePermissions {
    #[serde(default)]
    pub view: RoleSet,
    #[serde(default)]
    pub export: RoleSet,
}

impl TablePermissions {
    pub fn new<I, S>(view: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            view: roles(view),
            export: RoleSet::new(),
        }
    }

    pub fn export<I, S>(mut self, export: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.export = roles(export);
        self
    }
}

/// A named table view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableContext {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub columns: Vec<ColumnBinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_sort: Option<SortSpec>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub export_allowed: bool,
    /// Rows are limited to the actor's region
    #[serde(default)]
    pub regional_restricted: bool,
    pub permissions: TablePermissions,
}

impl TableContext {
    pub fn new(name: impl Into<String>, permissions: TablePermissions) -> Self {
        Self {
            name: name.into(),
            title: None,
            columns: Vec::new(),
            default_sort: None,
            page_size: default_page_size(),
            export_allowed: false,
            regional_restricted: false,
            permissions,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn column(mut self, column: ColumnBinding) -> Self {
        self.columns.push(column);
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.default_sort = Some(SortSpec {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn exportable(mut self) -> Self {
        self.export_allowed = true;
        self
    }

    pub fn regional(mut self) -> Self {
        self.regional_restricted = true;
        self
    }
}

/// Placement of one field inside a form section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldBinding {
    pub field: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub read_only: bool,
    /// Grid span (1-12); the engine default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<u8>,
    /// Extra visibility rules, OR-ed among themselves; must hold in
    /// addition to the field's own rules
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub show_when: Vec<ConditionalRule>,
}

impl FieldBinding {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            visible: true,
            read_only: false,
            span: None,
            show_when: Vec::new(),
        }
    }

    pub fn span(mut self, span: u8) -> Self {
        self.span = Some(span);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn show_when(mut self, rule: ConditionalRule) -> Self {
        self.show_when.push(rule);
        self
    }
}

/// Per-field adjustments applied while expanding a group reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BindingPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub show_when: Vec<ConditionalRule>,
}

impl BindingPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn span(mut self, span: u8) -> Self {
        self.span = Some(span);
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = Some(read_only);
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    pub fn show_when(mut self, rule: ConditionalRule) -> Self {
        self.show_when.push(rule);
        self
    }

    /// Apply this patch to a binding. Rules are appended, not replaced.
    pub fn apply(&self, binding: &mut FieldBinding) {
        if let Some(span) = self.span {
            binding.span = Some(span);
        }
        if let Some(read_only) = self.read_only {
            binding.read_only = read_only;
        }
        if let Some(visible) = self.visible {
            binding.visible = visible;
        }
        binding.show_when.extend(self.show_when.iter().cloned());
    }
}

/// Bulk inclusion of a semantic group's fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupReference {
    pub group: String,
    /// Only these members, when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<Vec<String>>,
    /// Members to leave out
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
    /// Per-field patches keyed by field key
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overrides: BTreeMap<String, BindingPatch>,
}

impl GroupReference {
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            include: None,
            exclude: Vec::new(),
            overrides: BTreeMap::new(),
        }
    }

    pub fn include<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn exclude<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn patch(mut self, key: impl Into<String>, patch: BindingPatch) -> Self {
        self.overrides.insert(key.into(), patch);
        self
    }

    /// Check whether a member passes the include/exclude lists.
    pub fn selects(&self, key: &str) -> bool {
        let included = self
            .include
            .as_ref()
            .map_or(true, |keys| keys.iter().any(|k| k == key));
        included && !self.exclude.iter().any(|k| k == key)
    }
}

/// Content of a section: an explicit binding or a group reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SectionContent {
    Field(FieldBinding),
    Group(GroupReference),
}

/// A titled block of a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub collapsible: bool,
    #[serde(default = "default_true")]
    pub default_expanded: bool,
    /// Section appears when any of these hold (empty = always)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub show_when: Vec<ConditionalRule>,
    pub permissions: PermissionConfig,
    pub content: Vec<SectionContent>,
}

impl Section {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        order: u32,
        permissions: PermissionConfig,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            order,
            collapsible: false,
            default_expanded: true,
            show_when: Vec::new(),
            permissions,
            content: Vec::new(),
        }
    }

    pub fn field(mut self, binding: FieldBinding) -> Self {
        self.content.push(SectionContent::Field(binding));
        self
    }

    pub fn group(mut self, reference: GroupReference) -> Self {
        self.content.push(SectionContent::Group(reference));
        self
    }

    pub fn collapsible(mut self, default_expanded: bool) -> Self {
        self.collapsible = true;
        self.default_expanded = default_expanded;
        self
    }

    pub fn show_when(mut self, rule: ConditionalRule) -> Self {
        self.show_when.push(rule);
        self
    }
}

/// A named form (detail view, edit form, modal).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormContext {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Coarse gate for the whole form and the "can save" signal
    pub permissions: PermissionConfig,
    pub sections: Vec<Section>,
}

impl FormContext {
    pub fn new(name: impl Into<String>, permissions: PermissionConfig) -> Self {
        Self {
            name: name.into(),
            title: None,
            permissions,
            sections: Vec::new(),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }
}
