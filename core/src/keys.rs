use crate::error::{CatalogError, Result};

/// Key layout under a namespace root:
///
/// ```text
/// {root}/media/{id}
/// {root}/media/{id}/likes
/// {root}/media/{id}/downloads
/// {root}/media/{id}/likers/{uid}
/// {root}/index/{term}/{id}
/// ```
#[derive(Debug, Clone)]
pub struct Keyspace {
    root: String,
}

impl Keyspace {
    pub fn new(root: impl Into<String>) -> Self {
        let root = root.into();
        Self { root: root.trim_matches('/').to_string() }
    }

    pub fn media(&self, id: &str) -> String { format!("{}/media/{id}", self.root) }
    pub fn likes(&self, id: &str) -> String { format!("{}/media/{id}/likes", self.root) }
    pub fn downloads(&self, id: &str) -> String { format!("{}/media/{id}/downloads", self.root) }
    pub fn likers(&self, id: &str) -> String { format!("{}/media/{id}/likers", self.root) }
    pub fn liker(&self, id: &str, uid: &str) -> String { format!("{}/media/{id}/likers/{uid}", self.root) }
    pub fn index_term(&self, term: &str) -> String { format!("{}/index/{term}", self.root) }
    pub fn index_entry(&self, term: &str, id: &str) -> String { format!("{}/index/{term}/{id}", self.root) }
}

/// Rejects empty segments and segments that would escape their level of the key tree.
pub fn check_segment(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(CatalogError::Validation(format!("{field} required")));
    }
    if value.contains('/') {
        return Err(CatalogError::Validation(format!("{field} may not contain '/'")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_namespaced() {
        let ks = Keyspace::new("/app/");
        assert_eq!(ks.media("42"), "app/media/42");
        assert_eq!(ks.liker("42", "u1"), "app/media/42/likers/u1");
        assert_eq!(ks.index_entry("forest", "42"), "app/index/forest/42");
    }

    #[test]
    fn segments_are_checked() {
        assert!(check_segment("id", "123").is_ok());
        assert!(matches!(check_segment("id", ""), Err(CatalogError::Validation(_))));
        assert!(matches!(check_segment("uid", "a/b"), Err(CatalogError::Validation(_))));
    }
}
