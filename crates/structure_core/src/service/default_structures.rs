//! Built-in structures seeded into an empty store.

use crate::model::field::{Field, FieldType};
use crate::model::structure::{Structure, StructureId, StructureType};

pub const WEB_PAGE_CONTENT_NAME: &str = "Web Page Content";
pub const NEWS_ITEM_NAME: &str = "News Item";

/// The default content structure; exactly one structure carries this flag.
pub fn web_page_content() -> Structure {
    let mut structure = Structure::new(StructureType::Content, WEB_PAGE_CONTENT_NAME);
    structure.default_structure = true;
    structure.description = "Default CMS Content Structure".to_string();
    structure
}

pub fn web_page_content_fields(structure_inode: StructureId) -> Vec<Field> {
    let mut title = Field::new(
        structure_inode,
        "Title",
        FieldType::Text,
        "text1",
        "ContentletTitle",
    );
    title.required = true;
    title.indexed = true;
    title.searchable = true;
    title.listed = true;

    let mut body = Field::new(
        structure_inode,
        "Body",
        FieldType::Wysiwyg,
        "text_area1",
        "Body",
    );
    body.required = true;
    body.indexed = true;
    body.sort_order = 8;

    vec![title, body]
}

pub fn news_item() -> Structure {
    let mut structure = Structure::new(StructureType::Content, NEWS_ITEM_NAME);
    structure.description = "News Items and Press Releases".to_string();
    structure
}

pub fn news_item_fields(structure_inode: StructureId) -> Vec<Field> {
    let mut headline = Field::new(
        structure_inode,
        "Headline",
        FieldType::Text,
        "text1",
        "NewsHeadline",
    );
    headline.required = true;
    headline.indexed = true;
    headline.listed = true;
    headline.searchable = true;

    let mut summary = Field::new(
        structure_inode,
        "Short Summary",
        FieldType::TextArea,
        "text_area1",
        "NewsSummary",
    );
    summary.hint = "This is teaser copy shown on listing pages".to_string();
    summary.required = true;
    summary.sort_order = 1;

    let mut publish_date = Field::new(
        structure_inode,
        "Publish Date",
        FieldType::DateTime,
        "date1",
        "NewsPublishDate",
    );
    publish_date.hint = "<br>The date this news item will be displayed".to_string();
    publish_date.required = true;
    publish_date.listed = true;
    publish_date.sort_order = 2;

    let mut expire_date = Field::new(
        structure_inode,
        "Expire Date",
        FieldType::DateTime,
        "date2",
        "NewsExpireDate",
    );
    expire_date.hint = "<br>The date this item will expire".to_string();
    expire_date.sort_order = 3;

    let mut body = Field::new(
        structure_inode,
        "Body",
        FieldType::Wysiwyg,
        "text_area2",
        "NewsBody",
    );
    body.required = true;
    body.indexed = true;
    body.sort_order = 4;

    vec![headline, summary, publish_date, expire_date, body]
}
