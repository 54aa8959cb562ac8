use rusqlite::Connection;
use std::sync::Arc;
use structure_core::db::open_db_in_memory;
use structure_core::model::folder::WorkflowScheme;
use structure_core::model::user::ROLE_CMS_ANONYMOUS;
use structure_core::{
    FactoryConfig, InMemoryContentTypeCache, LicenseLevel, PermissionLevel, RecordingEventSink,
    SqliteFieldRepository, SqlitePermissionChecker, SqliteStructureRepository, Structure,
    StructureFilter, StructureListQuery, StructureRepository, StructureService, StructureType,
    User,
};

type Service<'conn> = StructureService<
    SqliteStructureRepository<'conn>,
    SqliteFieldRepository<'conn>,
    SqlitePermissionChecker<'conn>,
>;

fn service(conn: &Connection, license_level: LicenseLevel) -> Service<'_> {
    StructureService::sqlite(
        conn,
        SqlitePermissionChecker::new(conn),
        Arc::new(InMemoryContentTypeCache::new()),
        Arc::new(RecordingEventSink::new()),
        FactoryConfig::with_license(license_level),
    )
}

fn create(service: &Service<'_>, kind: StructureType, name: &str) -> Structure {
    let mut structure = Structure::new(kind, name);
    service.save_structure(&mut structure).unwrap();
    structure
}

fn editor() -> User {
    User::new("editor-1", vec!["editors".to_string()])
}

fn names(structures: &[Structure]) -> Vec<&str> {
    structures.iter().map(|s| s.name.as_str()).collect()
}

#[test]
fn read_grants_drive_read_listings() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn, LicenseLevel::Platform);
    let blog = create(&service, StructureType::Content, "Blog");
    create(&service, StructureType::Content, "Secret");
    service
        .permissions()
        .grant(&blog, "editors", PermissionLevel::Read)
        .unwrap();

    let editor = editor();
    let readable = service
        .structures_with_read_permissions(Some(&editor), false)
        .unwrap();
    assert_eq!(names(&readable), vec!["Blog"]);

    let stranger = User::new("stranger", vec!["guests".to_string()]);
    assert!(service
        .structures_with_read_permissions(Some(&stranger), false)
        .unwrap()
        .is_empty());
    assert!(service
        .structures_with_read_permissions(None, false)
        .unwrap()
        .is_empty());
}

#[test]
fn write_permission_does_not_imply_read() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn, LicenseLevel::Platform);
    let blog = create(&service, StructureType::Content, "Blog");
    service
        .permissions()
        .grant(&blog, "editors", PermissionLevel::Write)
        .unwrap();

    let editor = editor();
    assert_eq!(
        names(
            &service
                .structures_with_write_permissions(Some(&editor), false)
                .unwrap()
        ),
        vec!["Blog"]
    );
    assert!(service
        .structures_with_read_permissions(Some(&editor), false)
        .unwrap()
        .is_empty());

    service
        .permissions()
        .grant(&blog, "editors", PermissionLevel::Read)
        .unwrap();
    assert_eq!(
        service
            .structures_with_read_permissions(Some(&editor), false)
            .unwrap()
            .len(),
        1
    );
    assert_eq!(
        service
            .structures_with_write_permissions(Some(&editor), false)
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn admins_see_everything() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn, LicenseLevel::Platform);
    create(&service, StructureType::Content, "Blog");
    create(&service, StructureType::Widget, "Banner");

    let admin = User::admin("admin");
    assert_eq!(
        names(
            &service
                .structures_with_write_permissions(Some(&admin), false)
                .unwrap()
        ),
        vec!["Banner", "Blog"]
    );
}

#[test]
fn frontend_roles_expose_anonymous_grants() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn, LicenseLevel::Platform);
    let public = create(&service, StructureType::Content, "Public Page");
    service
        .permissions()
        .grant(&public, ROLE_CMS_ANONYMOUS, PermissionLevel::Read)
        .unwrap();

    assert!(service
        .structures_with_read_permissions(None, false)
        .unwrap()
        .is_empty());
    assert_eq!(
        names(&service.structures_with_read_permissions(None, true).unwrap()),
        vec!["Public Page"]
    );
}

#[test]
fn allowed_only_listing_skips_system_structures() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn, LicenseLevel::Platform);
    create(&service, StructureType::Content, "Blog");
    let mut host = Structure::new(StructureType::Content, "Host");
    host.system = true;
    service.save_structure(&mut host).unwrap();

    let admin = User::admin("admin");
    let everything = service
        .structures_for_user(Some(&admin), false, false)
        .unwrap();
    assert_eq!(everything.len(), 2);

    let allowed = service
        .structures_for_user(Some(&admin), false, true)
        .unwrap();
    assert_eq!(names(&allowed), vec!["Blog"]);

    let no_system = service
        .no_system_structures_with_read_permissions(Some(&admin), false)
        .unwrap();
    assert_eq!(names(&no_system), vec!["Blog"]);
}

#[test]
fn community_license_hides_forms_and_personas_from_users() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn, LicenseLevel::Community);
    create(&service, StructureType::Content, "Blog");
    create(&service, StructureType::Form, "Contact Form");
    create(&service, StructureType::Persona, "Visitor Persona");

    let admin = User::admin("admin");
    let listed = service
        .structures_for_user(Some(&admin), false, false)
        .unwrap();
    assert_eq!(names(&listed), vec!["Blog"]);
    assert_eq!(service.structures_count(&StructureFilter::default()).unwrap(), 1);

    let plain = service.structures(&StructureListQuery::default()).unwrap();
    assert_eq!(names(&plain), vec!["Blog", "Visitor Persona"]);

    let forms_on_request = service
        .structures(&StructureListQuery {
            filter: StructureFilter::of_type(StructureType::Form),
            ..StructureListQuery::default()
        })
        .unwrap();
    assert_eq!(names(&forms_on_request), vec!["Contact Form"]);
}

#[test]
fn standard_license_hides_nothing() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn, LicenseLevel::Standard);
    create(&service, StructureType::Content, "Blog");
    create(&service, StructureType::Form, "Contact Form");
    create(&service, StructureType::Persona, "Visitor Persona");

    let admin = User::admin("admin");
    assert_eq!(
        service
            .structures_for_user(Some(&admin), false, false)
            .unwrap()
            .len(),
        3
    );
    assert_eq!(service.structures_count(&StructureFilter::default()).unwrap(), 3);
}

#[test]
fn host_and_workflow_listings_are_read_filtered() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn, LicenseLevel::Platform);
    let repo = SqliteStructureRepository::new(&conn);

    let mut blog = Structure::new(StructureType::Content, "Blog");
    blog.host = "demo-host".to_string();
    service.save_structure(&mut blog).unwrap();
    let mut draft = Structure::new(StructureType::Content, "Draft");
    draft.host = "demo-host".to_string();
    service.save_structure(&mut draft).unwrap();
    create(&service, StructureType::Content, "Elsewhere");

    service
        .permissions()
        .grant(&blog, "editors", PermissionLevel::Read)
        .unwrap();

    repo.upsert_workflow_scheme(&WorkflowScheme {
        id: "editorial".to_string(),
        name: "Editorial".to_string(),
    })
    .unwrap();
    repo.link_workflow_scheme("editorial", blog.inode).unwrap();
    repo.link_workflow_scheme("editorial", draft.inode).unwrap();

    let editor = editor();
    assert_eq!(
        names(
            &service
                .structures_under_host("demo-host", Some(&editor), false)
                .unwrap()
        ),
        vec!["Blog"]
    );
    assert_eq!(
        names(
            &service
                .structures_by_workflow_scheme("editorial", Some(&editor), false)
                .unwrap()
        ),
        vec!["Blog"]
    );

    let admin = User::admin("admin");
    assert_eq!(
        service
            .structures_by_workflow_scheme("editorial", Some(&admin), false)
            .unwrap()
            .len(),
        2
    );
}

#[test]
fn find_structures_user_can_use_filters_name_type_and_window() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn, LicenseLevel::Platform);
    let mut granted = Vec::new();
    for (kind, name) in [
        (StructureType::Content, "News Alpha"),
        (StructureType::Content, "News Beta"),
        (StructureType::Widget, "News Widget"),
        (StructureType::Content, "News Gamma"),
        (StructureType::Content, "Blog"),
    ] {
        granted.push(create(&service, kind, name));
    }
    for structure in &granted[..3] {
        service
            .permissions()
            .grant(structure, "editors", PermissionLevel::Read)
            .unwrap();
    }
    service
        .permissions()
        .grant(&granted[4], "editors", PermissionLevel::Read)
        .unwrap();

    let editor = editor();
    let all_news = service
        .find_structures_user_can_use(Some(&editor), "news", None, 0, 0)
        .unwrap();
    assert_eq!(names(&all_news), vec!["News Alpha", "News Beta", "News Widget"]);

    let content_news = service
        .find_structures_user_can_use(
            Some(&editor),
            "NEWS",
            Some(StructureType::Content),
            1,
            5,
        )
        .unwrap();
    assert_eq!(names(&content_news), vec!["News Beta"]);

    assert!(service
        .find_structures_user_can_use(Some(&editor), "news", None, 10, 5)
        .unwrap()
        .is_empty());

    let eclair = create(&service, StructureType::Content, "ÉCLAIR Recipes");
    service
        .permissions()
        .grant(&eclair, "editors", PermissionLevel::Read)
        .unwrap();
    for query in ["ÉCLAIR", "éclair", "Éclair rec"] {
        let found = service
            .find_structures_user_can_use(Some(&editor), query, None, 0, 0)
            .unwrap();
        assert_eq!(names(&found), vec!["ÉCLAIR Recipes"], "query {query}");
    }
    let listed = service
        .structures(&StructureListQuery {
            filter: StructureFilter {
                name_like: Some("écLAIR recipes".to_string()),
                ..StructureFilter::default()
            },
            ..StructureListQuery::default()
        })
        .unwrap();
    assert_eq!(names(&listed), vec!["ÉCLAIR Recipes"]);
}
