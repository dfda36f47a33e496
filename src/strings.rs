//! String interning for repeated control-group and security-label text.
//!
//! Process entries store only the [`StringId`]; many processes share the same
//! cgroup set or label, so the text is kept once.

use ahash::AHashMap as HashMap;
use std::sync::Arc;

/// Small integer handle for an interned string.
pub type StringId = u32;

/// Content-addressed string store. Equal text must always yield the same id
/// and ids stay valid for the life of the table.
pub trait Interner {
    fn intern(&mut self, text: &str) -> StringId;
    fn lookup(&self, id: StringId) -> Option<&str>;
}

/// Default in-memory interner.
#[derive(Debug, Default)]
pub struct StringTable {
    ids: HashMap<Arc<str>, StringId>,
    strings: Vec<Arc<str>>,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl Interner for StringTable {
    fn intern(&mut self, text: &str) -> StringId {
        if let Some(&id) = self.ids.get(text) {
            return id;
        }
        let id = self.strings.len() as StringId;
        let shared: Arc<str> = Arc::from(text);
        self.strings.push(Arc::clone(&shared));
        self.ids.insert(shared, id);
        id
    }

    fn lookup(&self, id: StringId) -> Option<&str> {
        self.strings.get(id as usize).map(|s| &**s)
    }
}
