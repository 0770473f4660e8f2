pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// The sole input of the catalog controller: every filter field plus the
/// page cursor. Unset fields stay empty/`None` and are omitted from the
/// outgoing request entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    pub cve: String,
    pub title: String,
    pub pushed: Option<bool>,
    pub source: String,
    pub page_no: u32,
    pub page_size: u32,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            cve: String::new(),
            title: String::new(),
            pushed: None,
            source: String::new(),
            page_no: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One user edit. Everything except `Page` resets the cursor to page 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterEdit {
    Cve(String),
    Title(String),
    Pushed(Option<bool>),
    Source(String),
    Page(u32),
}

impl FilterState {
    /// Whether applying `edit` would actually change this state. Assigning a
    /// field its current value is not a change and must not schedule a fetch.
    pub fn differs(&self, edit: &FilterEdit) -> bool {
        match edit {
            FilterEdit::Cve(value) => *value != self.cve,
            FilterEdit::Title(value) => *value != self.title,
            FilterEdit::Pushed(value) => *value != self.pushed,
            FilterEdit::Source(value) => *value != self.source,
            FilterEdit::Page(page) => *page != self.page_no,
        }
    }

    pub fn apply(&mut self, edit: FilterEdit) {
        match edit {
            FilterEdit::Cve(value) => {
                self.cve = value;
                self.page_no = 1;
            }
            FilterEdit::Title(value) => {
                self.title = value;
                self.page_no = 1;
            }
            FilterEdit::Pushed(value) => {
                self.pushed = value;
                self.page_no = 1;
            }
            FilterEdit::Source(value) => {
                self.source = value;
                self.page_no = 1;
            }
            FilterEdit::Page(page) => {
                self.page_no = page;
            }
        }
    }

    /// Request parameters for the list call. Empty/unset fields never appear
    /// as keys, so the backend's no-filter defaults apply.
    pub fn query_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("page_no".to_string(), self.page_no.to_string()),
            ("page_size".to_string(), self.page_size.to_string()),
        ];
        if !self.cve.trim().is_empty() {
            params.push(("cve".to_string(), self.cve.trim().to_string()));
        }
        if !self.title.trim().is_empty() {
            params.push(("title".to_string(), self.title.trim().to_string()));
        }
        if let Some(pushed) = self.pushed {
            params.push(("pushed".to_string(), pushed.to_string()));
        }
        if !self.source.trim().is_empty() {
            params.push(("source_name".to_string(), self.source.trim().to_string()));
        }
        params
    }
}
