use rusqlite::Connection;
use std::sync::Arc;
use structure_core::db::open_db_in_memory;
use structure_core::model::folder::WorkflowScheme;
use structure_core::repo::field_repo::FieldRepository;
use structure_core::{
    AllowAllPermissions, FactoryConfig, Field, FieldType, InMemoryContentTypeCache,
    PermissionLevel, RecordingEventSink, RepoError, SaveOutcome, ServiceError, SortDirection,
    SqliteFieldRepository, SqlitePermissionChecker, SqliteStructureRepository, Structure,
    StructureFilter, StructureListQuery, StructureOrder, StructureRepository, StructureService,
    StructureType, StructureValidationError, SYSTEM_HOST,
};
use uuid::Uuid;

fn service(
    conn: &Connection,
) -> StructureService<SqliteStructureRepository<'_>, SqliteFieldRepository<'_>, AllowAllPermissions>
{
    StructureService::sqlite(
        conn,
        AllowAllPermissions,
        Arc::new(InMemoryContentTypeCache::new()),
        Arc::new(RecordingEventSink::new()),
        FactoryConfig::default(),
    )
}

#[test]
fn save_creates_then_updates() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let mut article = Structure::new(StructureType::Content, "Article");
    assert_eq!(
        service.save_structure(&mut article).unwrap(),
        SaveOutcome::Created
    );
    assert!(article.idate > 0);
    assert_eq!(article.mod_date, article.idate);

    article.description = "Long-form posts".to_string();
    assert_eq!(
        service.save_structure(&mut article).unwrap(),
        SaveOutcome::Updated
    );

    let loaded = service.structure_by_inode(article.inode).unwrap().unwrap();
    assert_eq!(loaded.name, "Article");
    assert_eq!(loaded.velocity_var_name, "article");
    assert_eq!(loaded.description, "Long-form posts");
    assert_eq!(loaded.host, SYSTEM_HOST);
}

#[test]
fn lookups_return_none_for_unknown_structures() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    assert!(service.structure_by_inode(Uuid::new_v4()).unwrap().is_none());
    assert!(service.structure_by_type_name("Nope").unwrap().is_none());
    assert!(service.structure_by_velocity_var_name("nope").unwrap().is_none());
    assert!(service.default_structure().unwrap().is_none());
}

#[test]
fn velocity_var_name_lookup_ignores_case_and_blank_input() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let mut news = Structure::new(StructureType::Content, "Press Release");
    service.save_structure(&mut news).unwrap();
    assert_eq!(news.velocity_var_name, "pressRelease");

    let found = service
        .structure_by_velocity_var_name("PRESSRELEASE")
        .unwrap()
        .unwrap();
    assert_eq!(found.inode, news.inode);
    assert!(service.structure_by_velocity_var_name("   ").unwrap().is_none());

    let by_name = service.structure_by_type_name("Press Release").unwrap().unwrap();
    assert_eq!(by_name.inode, news.inode);
}

#[test]
fn save_rejects_invalid_structures() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let mut blank = Structure::new(StructureType::Content, "  ");
    let err = service.save_structure(&mut blank).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Repo(RepoError::Validation(StructureValidationError::BlankName))
    ));

    let mut bad_var = Structure::new(StructureType::Content, "Event");
    bad_var.velocity_var_name = "9 lives".to_string();
    let err = service.save_structure(&mut bad_var).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Repo(RepoError::Validation(
            StructureValidationError::InvalidVelocityVarName(_)
        ))
    ));
}

#[test]
fn save_with_id_keeps_the_given_inode() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let imported_id = Uuid::new_v4();

    let mut imported = Structure::new(StructureType::Widget, "Imported Widget");
    service
        .save_structure_with_id(&mut imported, imported_id)
        .unwrap();

    assert_eq!(imported.inode, imported_id);
    let loaded = service.structure_by_inode(imported_id).unwrap().unwrap();
    assert_eq!(loaded.structure_type, StructureType::Widget);
}

#[test]
fn delete_removes_fields_links_and_permissions() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let repo = SqliteStructureRepository::new(&conn);
    let fields = SqliteFieldRepository::new(&conn);

    let mut blog = Structure::new(StructureType::Content, "Blog");
    service.save_structure(&mut blog).unwrap();
    service
        .save_field(&Field::new(blog.inode, "Title", FieldType::Text, "text1", "title"))
        .unwrap();
    repo.upsert_workflow_scheme(&WorkflowScheme {
        id: "scheme-1".to_string(),
        name: "Default".to_string(),
    })
    .unwrap();
    repo.link_workflow_scheme("scheme-1", blog.inode).unwrap();
    SqlitePermissionChecker::new(&conn)
        .grant(&blog, "editors", PermissionLevel::Read)
        .unwrap();

    service.delete_structure(blog.inode).unwrap();

    assert!(service.structure_by_inode(blog.inode).unwrap().is_none());
    assert!(fields.fields_for_structure(blog.inode).unwrap().is_empty());
    assert!(repo.list_by_workflow_scheme("scheme-1").unwrap().is_empty());
    let permission_rows: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM permissions WHERE inode_id = ?1;",
            [blog.inode.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(permission_rows, 0);
}

#[test]
fn delete_missing_structure_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let missing = Uuid::new_v4();

    match service.delete_structure(missing).unwrap_err() {
        ServiceError::NotFound(id) => assert_eq!(id, missing),
        other => panic!("unexpected error: {other}"),
    }

    let repo = SqliteStructureRepository::new(&conn);
    assert!(matches!(
        repo.delete(missing).unwrap_err(),
        RepoError::NotFound(_)
    ));
}

#[test]
fn url_map_patterns_are_cleaned_and_sorted_descending() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let mut news = Structure::new(StructureType::Content, "News");
    news.url_map_pattern = Some(" news/{urlTitle} ".to_string());
    service.save_structure(&mut news).unwrap();

    let mut blog = Structure::new(StructureType::Content, "Blog");
    blog.url_map_pattern = Some("/blog/{urlTitle}".to_string());
    service.save_structure(&mut blog).unwrap();

    let mut plain = Structure::new(StructureType::Content, "Plain");
    plain.url_map_pattern = Some("   ".to_string());
    service.save_structure(&mut plain).unwrap();
    assert_eq!(plain.url_map_pattern, None);

    let patterns = service.url_map_patterns().unwrap();
    let values: Vec<&str> = patterns
        .iter()
        .map(|entry| entry.url_map_pattern.as_str())
        .collect();
    assert_eq!(values, vec!["/news/{urlTitle}", "/blog/{urlTitle}"]);
    assert_eq!(patterns[0].inode, news.inode);
}

#[test]
fn list_applies_typed_filters_order_and_paging() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    for (kind, name) in [
        (StructureType::Content, "Alpha"),
        (StructureType::Content, "Beta"),
        (StructureType::Widget, "Gamma"),
        (StructureType::Content, "Delta 100%"),
    ] {
        service
            .save_structure(&mut Structure::new(kind, name))
            .unwrap();
    }

    let content_only = service
        .structures(&StructureListQuery {
            filter: StructureFilter::of_type(StructureType::Content),
            ..StructureListQuery::default()
        })
        .unwrap();
    let names: Vec<&str> = content_only.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "Beta", "Delta 100%"]);

    let descending_page = service
        .structures(&StructureListQuery {
            direction: SortDirection::Desc,
            limit: Some(2),
            offset: 1,
            ..StructureListQuery::ordered(StructureOrder::Name)
        })
        .unwrap();
    let names: Vec<&str> = descending_page.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Delta 100%", "Beta"]);

    let percent = service
        .structures(&StructureListQuery {
            filter: StructureFilter {
                name_like: Some("100%".to_string()),
                ..StructureFilter::default()
            },
            ..StructureListQuery::default()
        })
        .unwrap();
    assert_eq!(percent.len(), 1);
    assert_eq!(percent[0].name, "Delta 100%");

    let wildcard_only = service
        .structures(&StructureListQuery {
            filter: StructureFilter {
                name_like: Some("%".to_string()),
                ..StructureFilter::default()
            },
            ..StructureListQuery::default()
        })
        .unwrap();
    assert_eq!(wildcard_only.len(), 1);

    assert_eq!(
        service
            .structures_count(&StructureFilter::of_type(StructureType::Content))
            .unwrap(),
        3
    );
    assert_eq!(
        service.all_structure_names().unwrap(),
        vec!["Alpha", "Beta", "Delta 100%", "Gamma"]
    );
    assert_eq!(
        service.all_velocity_var_names().unwrap(),
        vec!["alpha", "beta", "delta100", "gamma"]
    );
}

#[test]
fn structure_with_fields_loads_fields_in_sort_order() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let fields = SqliteFieldRepository::new(&conn);

    let mut event = Structure::new(StructureType::Content, "Event");
    service.save_structure(&mut event).unwrap();

    let mut starts = Field::new(event.inode, "Starts", FieldType::DateTime, "date1", "starts");
    starts.sort_order = 2;
    let mut title = Field::new(event.inode, "Title", FieldType::Text, "text1", "title");
    title.sort_order = 1;
    service.save_field(&starts).unwrap();
    service.save_field(&title).unwrap();

    let loaded = service.structure_with_fields(event.inode).unwrap().unwrap();
    let vars: Vec<&str> = loaded
        .fields
        .iter()
        .map(|field| field.velocity_var_name.as_str())
        .collect();
    assert_eq!(vars, vec!["title", "starts"]);
    assert!(loaded.field_by_var("starts").is_some());

    assert_eq!(fields.delete_fields_for_structure(event.inode).unwrap(), 2);
    assert!(service
        .structure_with_fields(event.inode)
        .unwrap()
        .unwrap()
        .fields
        .is_empty());
}

#[test]
fn disable_default_clears_the_flag() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let mut page = Structure::new(StructureType::Content, "Page Content");
    page.default_structure = true;
    service.save_structure(&mut page).unwrap();
    assert_eq!(
        service.default_structure().unwrap().unwrap().inode,
        page.inode
    );

    service.disable_default().unwrap();
    assert!(service.default_structure().unwrap().is_none());
    service.disable_default().unwrap();
}
