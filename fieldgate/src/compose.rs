//! Context composition.
//!
//! Combines the field registry with a named context, the actor's
//! permissions and the record's conditional rules into the resolved
//! column/section lists consumed by the rendering layer.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::config::EngineConfig;
use crate::context::{
    Alignment, FieldBinding, FormContext, Section, SectionContent, SortSpec, TableContext,
};
use crate::error::{ConfigError, ResolveError, Result};
use crate::options::filter_options;
use crate::permission::PermissionResolver;
use crate::registry::FieldRegistry;
use crate::rule::RuleEvaluator;
use crate::types::{
    Actor, DataType, EnumOption, FieldDefinition, InputType, Record, RoleSet, ValidationRule,
};

/// A table column the actor may see.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ResolvedColumn {
    pub field: String,
    pub label: String,
    pub data_type: DataType,
    pub width: Option<u32>,
    pub sortable: bool,
    pub filterable: bool,
    pub align: Alignment,
    pub sticky: bool,
}

/// A table view resolved for one actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ResolvedTable {
    pub name: String,
    pub title: Option<String>,
    pub columns: Vec<ResolvedColumn>,
    /// Dropped when the sort column is not visible to the actor
    pub default_sort: Option<SortSpec>,
    pub page_size: u32,
    /// The table allows export and the actor holds an export role
    pub export_allowed: bool,
    pub regional_restricted: bool,
}

/// One cell of a resolved row; `None` when absent or not viewable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ResolvedCell {
    pub field: String,
    pub value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ResolvedRow {
    pub cells: Vec<ResolvedCell>,
}

/// Rendering instructions for one field of a form section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ResolvedField {
    pub key: String,
    pub label: String,
    pub data_type: DataType,
    pub input_type: InputType,
    pub group: String,
    pub visible: bool,
    pub read_only: bool,
    pub span: u8,
    pub required: bool,
    /// Validation rules active for this record
    pub validations: Vec<ValidationRule>,
    /// Selectable options, for enumerated fields
    pub options: Vec<EnumOption>,
    pub computed: bool,
    pub computed_value: Option<Value>,
    pub help_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ResolvedSection {
    pub id: String,
    pub title: String,
    pub order: u32,
    pub collapsible: bool,
    pub default_expanded: bool,
    /// The actor may edit within this section
    pub editable: bool,
    pub fields: Vec<ResolvedField>,
}

/// A form resolved for one actor and record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ResolvedForm {
    pub name: String,
    pub title: Option<String>,
    /// Whether to offer a save action at all
    pub can_edit: bool,
    pub sections: Vec<ResolvedSection>,
}

/// Location string used in configuration errors.
pub fn section_location(form: &str, section: &str) -> String {
    format!("form:{}/section:{}", form, section)
}

/// Expand a section's content into concrete bindings, in display order.
///
/// Group references become one binding per selected group member (registry
/// display order), patched by key. Explicit bindings keep their position.
pub fn expand_section(
    registry: &FieldRegistry,
    section: &Section,
    location: &str,
) -> std::result::Result<Vec<FieldBinding>, ConfigError> {
    let mut placed: Vec<((usize, usize), FieldBinding)> = Vec::new();

    for (position, content) in section.content.iter().enumerate() {
        match content {
            SectionContent::Field(binding) => {
                registry.require(&binding.field, location)?;
                placed.push(((position, 0), binding.clone()));
            }
            SectionContent::Group(reference) => {
                let members = registry.group_members(&reference.group).ok_or_else(|| {
                    ConfigError::UnknownGroup {
                        location: location.to_string(),
                        group: reference.group.clone(),
                    }
                })?;

                for (rank, field) in members.into_iter().enumerate() {
                    if !reference.selects(&field.key) {
                        continue;
                    }
                    let mut binding = FieldBinding::new(field.key.clone());
                    if let Some(patch) = reference.overrides.get(&field.key) {
                        patch.apply(&mut binding);
                    }
                    placed.push(((position, rank), binding));
                }
            }
        }
    }

    placed.sort_by_key(|(slot, _)| *slot);
    Ok(placed.into_iter().map(|(_, binding)| binding).collect())
}

/// Resolves contexts for one evaluation date.
pub struct Composer<'a> {
    config: &'a EngineConfig,
    registry: &'a FieldRegistry,
    evaluator: RuleEvaluator,
    permissions: PermissionResolver<'a>,
}

impl<'a> Composer<'a> {
    pub fn new(config: &'a EngineConfig, registry: &'a FieldRegistry, evaluator: RuleEvaluator) -> Self {
        Self {
            config,
            registry,
            evaluator,
            permissions: PermissionResolver::new(&config.settings, evaluator),
        }
    }

    pub fn permissions(&self) -> &PermissionResolver<'a> {
        &self.permissions
    }

    pub fn evaluator(&self) -> RuleEvaluator {
        self.evaluator
    }

    fn table(&self, name: &str) -> Result<&'a TableContext> {
        if let Some(table) = self.config.tables.iter().find(|t| t.name == name) {
            return Ok(table);
        }
        if self.config.forms.iter().any(|f| f.name == name) {
            return Err(ResolveError::WrongContextKind {
                name: name.to_string(),
                expected: "table",
            });
        }
        Err(ResolveError::UnknownContext(name.to_string()))
    }

    fn form(&self, name: &str) -> Result<&'a FormContext> {
        if let Some(form) = self.config.forms.iter().find(|f| f.name == name) {
            return Ok(form);
        }
        if self.config.tables.iter().any(|t| t.name == name) {
            return Err(ResolveError::WrongContextKind {
                name: name.to_string(),
                expected: "form",
            });
        }
        Err(ResolveError::UnknownContext(name.to_string()))
    }

    /// Visible columns of a table the actor's roles may see, in order.
    ///
    /// Empty when the actor holds none of the table's view roles.
    pub fn resolve_table_columns(&self, name: &str, roles: &RoleSet) -> Result<Vec<ResolvedColumn>> {
        let table = self.table(name)?;
        if table.permissions.view.is_disjoint(roles) {
            return Ok(Vec::new());
        }

        let location = format!("table:{}", table.name);
        let mut columns = Vec::new();
        for (position, binding) in table.columns.iter().enumerate() {
            let field = self.registry.require(&binding.field, &location)?;
            if !binding.visible || field.permissions.view.is_disjoint(roles) {
                continue;
            }
            let slot = (binding.order.unwrap_or(position as u32), position);
            columns.push((
                slot,
                ResolvedColumn {
                    field: field.key.clone(),
                    label: field.label.clone(),
                    data_type: field.data_type,
                    width: binding.width,
                    sortable: binding.sortable,
                    filterable: binding.filterable,
                    align: binding.align,
                    sticky: binding.sticky,
                },
            ));
        }

        columns.sort_by_key(|(slot, _)| *slot);
        Ok(columns.into_iter().map(|(_, column)| column).collect())
    }

    /// The full table view for an actor.
    pub fn resolve_table(&self, name: &str, actor: &Actor) -> Result<ResolvedTable> {
        let table = self.table(name)?;
        let columns = self.resolve_table_columns(name, &actor.roles)?;
        let default_sort = table
            .default_sort
            .clone()
            .filter(|sort| columns.iter().any(|c| c.field == sort.field));
        let export_allowed = table.export_allowed
            && !columns.is_empty()
            && actor.has_any_role(&table.permissions.export);

        Ok(ResolvedTable {
            name: table.name.clone(),
            title: table.title.clone(),
            columns,
            default_sort,
            page_size: table.page_size,
            export_allowed,
            regional_restricted: table.regional_restricted,
        })
    }

    /// Whether a row (record) appears in the table for this actor.
    pub fn can_view_row(&self, name: &str, actor: &Actor, record: &Record) -> Result<bool> {
        let table = self.table(name)?;
        Ok(actor.has_any_role(&table.permissions.view)
            && self
                .permissions
                .region_allows(table.regional_restricted, actor, record))
    }

    /// Rows the actor may see, in input order.
    pub fn filter_rows<'r>(&self, name: &str, actor: &Actor, rows: &'r [Record]) -> Result<Vec<&'r Record>> {
        let mut visible = Vec::with_capacity(rows.len());
        for row in rows {
            if self.can_view_row(name, actor, row)? {
                visible.push(row);
            }
        }
        Ok(visible)
    }

    /// Cells of one row, masking fields the actor may not view on it.
    pub fn resolve_row(&self, name: &str, actor: &Actor, record: &Record) -> Result<Option<ResolvedRow>> {
        if !self.can_view_row(name, actor, record)? {
            return Ok(None);
        }

        let columns = self.resolve_table_columns(name, &actor.roles)?;
        let location = format!("table:{}", name);
        let mut cells = Vec::with_capacity(columns.len());
        for column in columns {
            let field = self.registry.require(&column.field, &location)?;
            let value = if self.permissions.can_view(field, actor, record) {
                self.field_value(field, record)
            } else {
                None
            };
            cells.push(ResolvedCell {
                field: column.field,
                value,
            });
        }
        Ok(Some(ResolvedRow { cells }))
    }

    /// Whether the actor may save the form at all.
    pub fn can_edit_form(&self, name: &str, actor: &Actor, record: &Record) -> Result<bool> {
        let form = self.form(name)?;
        Ok(self.permissions.check_view(&form.permissions, actor, record).is_allowed()
            && self.permissions.check_edit(&form.permissions, actor, record).is_allowed())
    }

    /// Ordered sections of a form with their resolved fields.
    pub fn resolve_sections(&self, name: &str, actor: &Actor, record: &Record) -> Result<Vec<ResolvedSection>> {
        Ok(self.resolve_form(name, actor, record)?.sections)
    }

    /// The complete form resolution.
    pub fn resolve_form(&self, name: &str, actor: &Actor, record: &Record) -> Result<ResolvedForm> {
        let form = self.form(name)?;
        let mut resolved = ResolvedForm {
            name: form.name.clone(),
            title: form.title.clone(),
            can_edit: false,
            sections: Vec::new(),
        };

        // Coarse gate before any per-field reasoning
        if !self.permissions.check_view(&form.permissions, actor, record).is_allowed() {
            return Ok(resolved);
        }
        resolved.can_edit = self
            .permissions
            .check_edit(&form.permissions, actor, record)
            .is_allowed();

        let mut sections: Vec<(usize, &Section)> = form.sections.iter().enumerate().collect();
        sections.sort_by_key(|(position, section)| (section.order, *position));

        for (_, section) in sections {
            if let Some(section) = self.resolve_section(form, section, actor, record)? {
                resolved.sections.push(section);
            }
        }
        Ok(resolved)
    }

    fn resolve_section(
        &self,
        form: &FormContext,
        section: &Section,
        actor: &Actor,
        record: &Record,
    ) -> Result<Option<ResolvedSection>> {
        if !self.permissions.check_view(&section.permissions, actor, record).is_allowed()
            || !self.evaluator.any(&section.show_when, record)
        {
            return Ok(None);
        }
        let editable = self
            .permissions
            .check_edit(&section.permissions, actor, record)
            .is_allowed();

        let location = section_location(&form.name, &section.id);
        let bindings = expand_section(self.registry, section, &location)?;

        let mut fields = Vec::with_capacity(bindings.len());
        for binding in &bindings {
            let field = self.registry.require(&binding.field, &location)?;
            if let Some(resolved) = self.resolve_field(field, binding, editable, actor, record) {
                fields.push(resolved);
            }
        }

        // Sections with nothing to show are indistinguishable from absent ones
        if fields.is_empty() {
            return Ok(None);
        }

        Ok(Some(ResolvedSection {
            id: section.id.clone(),
            title: section.title.clone(),
            order: section.order,
            collapsible: section.collapsible,
            default_expanded: section.default_expanded,
            editable,
            fields,
        }))
    }

    fn resolve_field(
        &self,
        field: &FieldDefinition,
        binding: &FieldBinding,
        section_editable: bool,
        actor: &Actor,
        record: &Record,
    ) -> Option<ResolvedField> {
        if !self.evaluator.any(&field.show_when, record)
            || !self.evaluator.any(&binding.show_when, record)
            || !self.permissions.can_view(field, actor, record)
        {
            return None;
        }

        let read_only = binding.read_only
            || !section_editable
            || !self.permissions.can_edit(field, actor, record);
        let options = if field.is_enum() {
            filter_options(field, &actor.roles).into_iter().cloned().collect()
        } else {
            Vec::new()
        };

        Some(ResolvedField {
            key: field.key.clone(),
            label: field.label.clone(),
            data_type: field.data_type,
            input_type: field.input_type(),
            group: field.group.clone(),
            visible: binding.visible,
            read_only,
            span: binding.span.unwrap_or(self.config.settings.default_span),
            required: self.evaluator.is_required(&field.required, record),
            validations: self
                .evaluator
                .active_validations(&field.validations, record)
                .into_iter()
                .cloned()
                .collect(),
            options,
            computed: field.is_computed(),
            computed_value: field
                .computed
                .as_ref()
                .and_then(|computation| computation.compute(record, self.evaluator.today())),
            help_text: field.help_text.clone(),
        })
    }

    /// Stored value, or the derived value for computed fields.
    fn field_value(&self, field: &FieldDefinition, record: &Record) -> Option<Value> {
        match &field.computed {
            Some(computation) => computation.compute(record, self.evaluator.today()),
            None => record.get(&field.key).cloned(),
        }
    }
}
