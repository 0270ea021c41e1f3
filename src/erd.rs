//! ERD notation export of a normalized model.
//!
//! Inheritance is rendered as joined tables: each entity gets only the columns
//! it declares or overrides, plus a foreign key to its parent's table.

use std::collections::BTreeMap;

use crate::analyzer::{AssociationTable, ElementKind, RelationKind};
use crate::model::{ModelEntity, NormalizedSchemaModel};
use crate::naming::NamingPolicy;

struct Column {
    name: String,
    typ: String,
    pk: bool,
    not_null: bool,
    fk: Option<String>,
}

impl Column {
    fn new(name: impl Into<String>, typ: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            typ: typ.into(),
            pk: false,
            not_null: false,
            fk: None,
        }
    }

    fn not_null(mut self, not_null: bool) -> Self {
        self.not_null = not_null;
        self
    }

    fn references(mut self, table: &str) -> Self {
        self.fk = Some(table.to_string());
        self
    }
}

struct Rel {
    left: String,
    left_card: &'static str,
    right: String,
    label: String,
}

/// Render a model to ERD notation.
pub fn render(model: &NormalizedSchemaModel, naming: &dyn NamingPolicy) -> String {
    let mut output = String::new();
    let mut rels = Vec::new();
    let mut first = true;

    for entity in model.topological() {
        if !first {
            output.push('\n');
        }
        first = false;
        render_entity(&mut output, &mut rels, entity, naming);
    }

    let owned: Vec<&AssociationTable> = model
        .associations()
        .filter(|a| !a.is_inherited())
        .collect();
    for table in &owned {
        output.push('\n');
        render_association(&mut output, &mut rels, table, naming);
    }

    if !rels.is_empty() {
        output.push_str("\nrel {\n");
        for rel in &rels {
            output.push_str(&format!(
                "    {} {} -- * {} : \"{}\"\n",
                rel.left, rel.left_card, rel.right, rel.label
            ));
        }
        output.push_str("}\n");
    }

    let arrangement = arrangement(model, &owned, naming);
    if !arrangement.is_empty() {
        output.push_str("\n@hint.arrangement = {\n");
        for row in &arrangement {
            output.push_str("    ");
            output.push_str(&row.join(" "));
            output.push('\n');
        }
        output.push_str("}\n");
    }

    output
}

fn render_entity(
    output: &mut String,
    rels: &mut Vec<Rel>,
    entity: &ModelEntity,
    naming: &dyn NamingPolicy,
) {
    let table = naming.table_name(&entity.id);
    let mut columns = vec![Column {
        pk: true,
        ..Column::new("id", "bigint")
    }];

    if let Some(parent) = entity.parent() {
        let parent_table = naming.table_name(&parent);
        columns.push(
            Column::new(naming.foreign_key_column(&parent.name), "bigint")
                .not_null(true)
                .references(&parent_table),
        );
        rels.push(Rel {
            left: parent_table,
            left_card: "1",
            right: table.clone(),
            label: "extends".into(),
        });
    }

    for field in entity.own_fields() {
        match &field.relation {
            RelationKind::Scalar(storage) => columns.push(
                Column::new(naming.column_name(field.name()), storage.erd_name())
                    .not_null(field.spec.required),
            ),
            RelationKind::ObjectReference { target, nullable } => {
                let target_table = naming.table_name(target);
                columns.push(
                    Column::new(naming.foreign_key_column(field.name()), "bigint")
                        .not_null(!nullable)
                        .references(&target_table),
                );
                rels.push(Rel {
                    left: target_table,
                    left_card: if *nullable { "0..1" } else { "1" },
                    right: table.clone(),
                    label: field.name().to_string(),
                });
            }
            // Rendered as association tables.
            RelationKind::MultiValued(_) => {}
        }
    }

    write_block(output, &table, &columns, None);
}

fn render_association(
    output: &mut String,
    rels: &mut Vec<Rel>,
    association: &AssociationTable,
    naming: &dyn NamingPolicy,
) {
    let table = naming.association_table_name(&association.owner, &association.field);
    let owner_table = naming.table_name(&association.owner);
    let owner_column = naming.foreign_key_column(&association.owner.name);

    let mut columns = vec![Column::new(&owner_column, "bigint")
        .not_null(true)
        .references(&owner_table)];
    rels.push(Rel {
        left: owner_table,
        left_card: "1",
        right: table.clone(),
        label: association.field.clone(),
    });

    let second = match &association.element {
        ElementKind::Entity(target) => {
            let target_table = naming.table_name(target);
            let mut target_column = naming.foreign_key_column(&target.name);
            if target_column == owner_column {
                target_column = naming.foreign_key_column(&association.field);
            }
            if target_column == owner_column {
                target_column = "element_id".to_string();
            }
            columns.push(
                Column::new(&target_column, "bigint")
                    .not_null(true)
                    .references(&target_table),
            );
            rels.push(Rel {
                left: target_table,
                left_card: "1",
                right: table.clone(),
                label: association.field.clone(),
            });
            target_column
        }
        ElementKind::Scalar(storage) => {
            columns.push(Column::new("ordinal", "integer").not_null(true));
            columns.push(Column::new("value", storage.erd_name()));
            "ordinal".to_string()
        }
    };

    write_block(output, &table, &columns, Some([owner_column.as_str(), second.as_str()]));
}

fn write_block(output: &mut String, table: &str, columns: &[Column], composite: Option<[&str; 2]>) {
    output.push_str(&format!("entity {} {{\n", table));
    for column in columns {
        output.push_str(&format!("    {} {}", column.name, column.typ));
        if column.pk {
            output.push_str(" pk");
        }
        if column.not_null {
            output.push_str(" not null");
        }
        if let Some(target) = &column.fk {
            output.push_str(&format!(" fk -> {}.id", target));
        }
        output.push('\n');
    }
    if let Some(key) = composite {
        output.push_str(&format!("    primary_key({})\n", key.join(", ")));
    }
    output.push_str("}\n");
}

/// Rows by inheritance depth, association tables last.
fn arrangement(
    model: &NormalizedSchemaModel,
    associations: &[&AssociationTable],
    naming: &dyn NamingPolicy,
) -> Vec<Vec<String>> {
    let mut rows: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    for entity in model.entities() {
        rows.entry(entity.depth)
            .or_default()
            .push(naming.table_name(&entity.id));
    }

    let mut rows: Vec<Vec<String>> = rows.into_values().collect();
    let tables: Vec<String> = associations
        .iter()
        .map(|a| naming.association_table_name(&a.owner, &a.field))
        .collect();
    if !tables.is_empty() {
        rows.push(tables);
    }

    for row in &mut rows {
        row.sort();
        row.dedup();
    }
    rows
}
