//! Plain-text statistics for the command line.

use unicode_width::UnicodeWidthStr;

use crate::analyzer::RelationKind;
use crate::corpus::Corpus;
use crate::model::NormalizedSchemaModel;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub title: String,
    rows: Vec<(String, String)>,
}

impl Summary {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            rows: Vec::new(),
        }
    }

    pub fn row(mut self, label: impl Into<String>, value: impl ToString) -> Self {
        self.rows.push((label.into(), value.to_string()));
        self
    }

    pub fn rows(&self) -> &[(String, String)] {
        &self.rows
    }

    pub fn from_corpus(corpus: &Corpus) -> Self {
        Self::new(format!("OCSF schema {}", corpus.version()))
            .row("objects", corpus.objects().count())
            .row("events", corpus.events().count())
            .row("categories", corpus.categories().len())
            .row("profiles", corpus.profiles().len())
            .row("primitive types", corpus.primitives().len())
    }

    pub fn from_model(model: &NormalizedSchemaModel) -> Self {
        let (mut scalar, mut reference, mut multi) = (0usize, 0usize, 0usize);
        for field in model.entities().flat_map(|e| e.fields.iter()) {
            match field.relation {
                RelationKind::Scalar(_) => scalar += 1,
                RelationKind::ObjectReference { .. } => reference += 1,
                RelationKind::MultiValued(_) => multi += 1,
            }
        }

        Self::new(format!("OCSF schema {}", model.version()))
            .row("objects", model.objects().count())
            .row("events", model.events().count())
            .row("association tables", model.associations().count())
            .row("scalar fields", scalar)
            .row("reference fields", reference)
            .row("multi-valued fields", multi)
            .row("enums", model.enums().len())
            .row("warnings", model.warnings().len())
    }

    /// Two columns, labels left-aligned and values right-aligned by display
    /// width.
    pub fn render(&self) -> String {
        let label_width = self
            .rows
            .iter()
            .map(|(l, _)| UnicodeWidthStr::width(l.as_str()))
            .max()
            .unwrap_or(0);
        let value_width = self
            .rows
            .iter()
            .map(|(_, v)| UnicodeWidthStr::width(v.as_str()))
            .max()
            .unwrap_or(0);
        let total =
            (label_width + 2 + value_width).max(UnicodeWidthStr::width(self.title.as_str()));

        let mut out = String::new();
        out.push_str(&self.title);
        out.push('\n');
        out.push_str(&"-".repeat(total));
        out.push('\n');
        for (label, value) in &self.rows {
            let used = UnicodeWidthStr::width(label.as_str()) + UnicodeWidthStr::width(value.as_str());
            let pad = total - used;
            out.push_str(label);
            out.push_str(&" ".repeat(pad));
            out.push_str(value);
            out.push('\n');
        }
        out
    }
}
