//! Well-known namespaces and names of the base content model.

use crate::types::QName;

/// Content model namespace (`cm`).
pub const CONTENT_MODEL_URI: &str = "http://www.alfresco.org/model/content/1.0";
/// System model namespace (`sys`).
pub const SYSTEM_MODEL_URI: &str = "http://www.alfresco.org/model/system/1.0";
/// Data dictionary namespace (`d`).
pub const DICTIONARY_MODEL_URI: &str = "http://www.alfresco.org/model/dictionary/1.0";
/// Query vocabulary namespace (`cmis`).
pub const CMIS_URI: &str = "http://www.alfresco.org/model/cmis/1.0/cs01";

/// `cm:content`, the property backing content stream metadata.
pub fn prop_content() -> QName {
    QName::new(CONTENT_MODEL_URI, "content")
}

/// `sys:node-uuid`, the property backing object ids.
pub fn prop_node_uuid() -> QName {
    QName::new(SYSTEM_MODEL_URI, "node-uuid")
}

/// `sys:base`, root of the class hierarchy.
pub fn type_base() -> QName {
    QName::new(SYSTEM_MODEL_URI, "base")
}

/// `cm:cmobject`.
pub fn type_cmobject() -> QName {
    QName::new(CONTENT_MODEL_URI, "cmobject")
}

/// `cm:content`, the document type.
pub fn type_content() -> QName {
    QName::new(CONTENT_MODEL_URI, "content")
}

/// `cm:folder`.
pub fn type_folder() -> QName {
    QName::new(CONTENT_MODEL_URI, "folder")
}

/// Maps query-vocabulary type ids onto dictionary class names.
///
/// Returns `None` for values that should be parsed as prefixed class names.
pub fn cmis_type_alias(type_id: &str) -> Option<QName> {
    match type_id {
        "cmis:document" => Some(type_content()),
        "cmis:folder" => Some(type_folder()),
        "cmis:item" => Some(type_cmobject()),
        _ => None,
    }
}
