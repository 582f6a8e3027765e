/// Requested document fields, e.g. `metadata.pert_desc` or `data`.
///
/// An empty projection selects every field. The store returns each
/// projected path under its last segment, so `metadata.pert_desc` comes
/// back as `pert_desc`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    fields: Vec<String>,
}

impl Projection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn is_all(&self) -> bool {
        self.fields.is_empty()
    }

    /// Collection-qualified select expressions in caller order.
    pub fn select_list(&self, collection: &str) -> Vec<String> {
        if self.fields.is_empty() {
            return vec![format!("{collection}.*")];
        }
        self.fields
            .iter()
            .map(|field| format!("{collection}.{field}"))
            .collect()
    }
}

impl<S: AsRef<str>> FromIterator<S> for Projection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|field| field.as_ref().trim().to_string())
                .filter(|field| !field.is_empty() && field != "*")
                .collect(),
        }
    }
}

impl From<&str> for Projection {
    fn from(field: &str) -> Self {
        std::iter::once(field).collect()
    }
}

impl From<String> for Projection {
    fn from(field: String) -> Self {
        std::iter::once(field).collect()
    }
}

impl From<Vec<&str>> for Projection {
    fn from(fields: Vec<&str>) -> Self {
        fields.into_iter().collect()
    }
}

impl From<Vec<String>> for Projection {
    fn from(fields: Vec<String>) -> Self {
        fields.into_iter().collect()
    }
}

impl<const N: usize> From<[&str; N]> for Projection {
    fn from(fields: [&str; N]) -> Self {
        fields.into_iter().collect()
    }
}

impl<T: Into<Projection>> From<Option<T>> for Projection {
    fn from(fields: Option<T>) -> Self {
        fields.map(Into::into).unwrap_or_default()
    }
}
