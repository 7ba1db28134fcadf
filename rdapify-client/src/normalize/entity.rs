//! Entity normalization: jCard extraction and recursion.

use rdapify_common::{normalized::EntityData, response::Entity};

/// Maps a raw entity, lifting contact properties out of its jCard. A
/// malformed jCard degrades to handle and roles.
pub(crate) fn normalize_entity(entity: &Entity) -> EntityData {
    let contact = entity.contact();
    let children = entity
        .object_common
        .entities
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(normalize_entity)
        .collect();
    let (name, organization, email, phone, address, country) = match contact {
        Some(c) => (c.full_name, c.organization, c.email, c.phone, c.address, c.country),
        None => (None, None, None, None, None, None),
    };
    EntityData {
        handle: entity.object_common.handle.clone(),
        roles: entity.roles.clone().unwrap_or_default(),
        name,
        organization,
        email,
        phone,
        address,
        country,
        entities: children,
    }
}

/// Maps the entity list of an object class.
pub(crate) fn normalize_entities(entities: Option<&Vec<Entity>>) -> Vec<EntityData> {
    entities
        .map(|entities| entities.iter().map(normalize_entity).collect())
        .unwrap_or_default()
}
