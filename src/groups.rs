use uuid::Uuid;
use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::store::Store;
use crate::models::models::Group;

pub fn get_group(store: &Store, group_id: &str) -> anyhow::Result<Option<Group>> {
    store.get_json::<Group>(&group_key(group_id))
}

pub fn list_groups(store: &Store) -> anyhow::Result<Vec<Group>> {
    let mut groups = Vec::new();
    for id in store.get_list(GROUPS_LIST_KEY)? {
        if let Some(g) = get_group(store, &id)? {
            groups.push(g);
        }
    }
    Ok(groups)
}

pub fn find_group_by_slug(store: &Store, slug: &str) -> anyhow::Result<Option<Group>> {
    Ok(list_groups(store)?.into_iter().find(|g| g.slug == slug))
}

pub fn create_group(
    store: &Store,
    title: &str,
    slug: &str,
    description: &str,
) -> Result<Group, ApiError> {
    if find_group_by_slug(store, slug)?.is_some() {
        return Err(ApiError::Conflict("A group with this slug already exists".to_string()));
    }

    let group = Group {
        id: Uuid::new_v4().to_string(),
        title: title.to_string(),
        slug: slug.to_string(),
        description: description.to_string(),
    };
    store.set_json(&group_key(&group.id), &group)?;

    let mut groups = store.get_list(GROUPS_LIST_KEY)?;
    groups.push(group.id.clone());
    store.set_json(GROUPS_LIST_KEY, &groups)?;

    tracing::info!(slug = %group.slug, "group created");
    Ok(group)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_are_unique() {
        let store = Store::default();
        let cats = create_group(&store, "Cats", "cats", "All about cats").unwrap();
        assert!(matches!(
            create_group(&store, "More cats", "cats", ""),
            Err(ApiError::Conflict(_))
        ));

        let found = find_group_by_slug(&store, "cats").unwrap().unwrap();
        assert_eq!(found, cats);
        assert_eq!(list_groups(&store).unwrap().len(), 1);
        assert!(find_group_by_slug(&store, "dogs").unwrap().is_none());
    }
}
