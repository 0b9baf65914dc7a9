use std::cell::RefCell;
use std::collections::HashMap;

use cadence_protocol::{Collaborator, CompileWarning, EntityRef, EntityResolver};

/// Memoised entity keys; each unresolved reference warns once.
pub(crate) struct TargetKeys<'r> {
    resolver: &'r dyn EntityResolver,
    cache: RefCell<HashMap<String, String>>,
    warnings: RefCell<Vec<CompileWarning>>,
}

impl<'r> TargetKeys<'r> {
    pub(crate) fn new(resolver: &'r dyn EntityResolver) -> Self {
        Self {
            resolver,
            cache: RefCell::new(HashMap::new()),
            warnings: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn key(&self, reference: &EntityRef) -> String {
        if let Some(id) = &reference.id {
            return id.clone();
        }
        if let Some(key) = self.cache.borrow().get(&reference.text) {
            return key.clone();
        }
        let key = match self.resolver.resolve(reference) {
            Some(id) => id,
            None => {
                log::warn!(
                    "Entity resolver has no match for '{}'; comparing by name",
                    reference.text
                );
                self.warnings.borrow_mut().push(CompileWarning::LookupMiss {
                    collaborator: Collaborator::Resolver,
                    reference: reference.text.clone(),
                    fallback: "compared by reference text".to_string(),
                });
                reference.text.trim().to_lowercase()
            }
        };
        self.cache
            .borrow_mut()
            .insert(reference.text.clone(), key.clone());
        key
    }

    pub(crate) fn into_warnings(self) -> Vec<CompileWarning> {
        self.warnings.into_inner()
    }
}
