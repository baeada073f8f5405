use std::collections::HashSet;

use crate::controller::ComponentId;

/// Object-id form of `name`: transliterated to ascii, lowercased, with every
/// run of other characters replaced by one `_`.
pub fn slugify(name: &str) -> String {
    slug::slugify(name).replace('-', "_")
}

/// Hands out `platform.object_id` entity ids, never the same one twice.
#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    allocated: HashSet<String>,
}

impl EntityIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id for a component named `name`.
    ///
    /// `taken` reports ids already used elsewhere (another entry). Clashes get
    /// `_2`, `_3`, ... appended; names with no usable characters fall back to
    /// the component id.
    pub fn allocate(
        &mut self,
        platform: &str,
        id: ComponentId,
        name: &str,
        taken: impl Fn(&str) -> bool,
    ) -> String {
        let slug = match slugify(name) {
            slug if slug.is_empty() => format!("homecenter_{}", id),
            slug => slug,
        };

        let base = format!("{}.{}", platform, slug);
        let mut candidate = base.clone();
        let mut suffix = 2;
        while self.allocated.contains(&candidate) || taken(&candidate) {
            candidate = format!("{}_{}", base, suffix);
            suffix += 1;
        }

        self.allocated.insert(candidate.clone());
        candidate
    }
}
