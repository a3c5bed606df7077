//! Context assembly and prompt rendering.

use std::collections::HashSet;
use std::fmt::Write;

use kgrag_core::types::{Context, Entity};

use crate::expand::Expansion;

pub const NO_DESCRIPTION: &str = "no description";

/// Combine matched entities and their expansion into one [`Context`].
///
/// Matched entities are unique by name. Related entities never repeat a
/// matched name. Identical triples are kept once.
pub fn assemble(matched: Vec<Entity>, expansion: Expansion) -> Context {
    let mut names = HashSet::new();
    let entities: Vec<Entity> = matched
        .into_iter()
        .filter(|e| names.insert(e.name.clone()))
        .collect();

    let mut seen = HashSet::new();
    let relationships = expansion
        .relationships
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect();

    let related_entities = expansion
        .neighbors
        .into_iter()
        .filter(|e| names.insert(e.name.clone()))
        .collect();

    Context {
        entities,
        relationships,
        related_entities,
    }
}

/// Render a context as the text handed to the generation model.
///
/// The entities section is always present; the other two only when non-empty.
pub fn render(context: &Context) -> String {
    let mut out = String::from("Relevant entities:\n");
    for entity in &context.entities {
        push_entity(&mut out, entity);
    }

    if !context.relationships.is_empty() {
        out.push_str("\nRelevant relationships:\n");
        for rel in &context.relationships {
            let _ = writeln!(out, "- {} {} {}", rel.source, rel.rel_type, rel.target);
        }
    }

    if !context.related_entities.is_empty() {
        out.push_str("\nRelated entities:\n");
        for entity in &context.related_entities {
            push_entity(&mut out, entity);
        }
    }

    out
}

fn push_entity(out: &mut String, entity: &Entity) {
    let _ = writeln!(
        out,
        "- {} ({}): {}",
        entity.name,
        entity.entity_type,
        entity.description_text().unwrap_or(NO_DESCRIPTION)
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use kgrag_core::types::RelationshipTriple;

    fn ml_expansion() -> Expansion {
        Expansion {
            relationships: vec![
                RelationshipTriple::new("AI", "ML", "includes"),
                RelationshipTriple::new("AI", "ML", "includes"),
            ],
            neighbors: vec![Entity::new("AI", "Concept"), Entity::new("ML", "Technology")],
        }
    }

    #[test]
    fn related_never_repeats_matched() {
        let ctx = assemble(vec![Entity::new("ML", "Technology")], ml_expansion());
        assert_eq!(ctx.entities.len(), 1);
        assert_eq!(ctx.related_entities, vec![Entity::new("AI", "Concept")]);
        assert_eq!(ctx.relationships.len(), 1);
    }

    #[test]
    fn renders_all_sections() {
        let ctx = assemble(
            vec![Entity::new("ML", "Technology").with_description("Learning from data")],
            ml_expansion(),
        );
        assert_eq!(
            render(&ctx),
            "Relevant entities:\n\
             - ML (Technology): Learning from data\n\
             \n\
             Relevant relationships:\n\
             - AI includes ML\n\
             \n\
             Related entities:\n\
             - AI (Concept): no description\n"
        );
    }

    #[test]
    fn empty_context_keeps_entities_header() {
        assert_eq!(render(&Context::default()), "Relevant entities:\n");
    }

    #[test]
    fn empty_description_renders_marker() {
        let ctx = assemble(
            vec![Entity::new("AI", "Concept").with_description("")],
            Expansion::default(),
        );
        assert_eq!(render(&ctx), "Relevant entities:\n- AI (Concept): no description\n");
    }
}
