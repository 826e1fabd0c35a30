//! Reserved field names and feature flags (spec §3).

pub const NSD_ID: &str = "nsd_id";
pub const NSD_DOC_TYPE: &str = "nsd_doc_type";
pub const NSD_URL: &str = "nsd_url";
pub const NSD_URL_VIEW: &str = "nsd_url_view";
pub const NSD_URL_DISPLAY: &str = "nsd_url_display";
pub const NSD_FILE_NAME: &str = "nsd_file_name";
pub const NSD_FILE_SIZE: &str = "nsd_file_size";
pub const NSD_MIME_TYPE: &str = "nsd_mime_type";
pub const NSD_DOC_CREATED_TS: &str = "nsd_doc_created_ts";
pub const NSD_DOC_MODIFIED_TS: &str = "nsd_doc_modified_ts";
pub const NSD_DOC_HASH: &str = "nsd_doc_hash";
pub const NSD_CRAWL_TYPE: &str = "nsd_crawl_type";
pub const NSD_PARENT_ID: &str = "nsd_parent_id";
pub const NSD_IS_PARENT: &str = "nsd_is_parent";
pub const NSD_REL_TYPE: &str = "nsd_rel_type";
pub const NSD_ACL_VIEW: &str = "nsd_acl_view";

pub const FEATURE_IS_CONTENT: &str = "is_content";
pub const FEATURE_IS_HIDDEN: &str = "is_hidden";
pub const FEATURE_IS_PRIMARY_KEY: &str = "is_primary_key";

pub const UNKNOWN_DOC_TYPE: &str = "Unknown";

/// True for any `nsd_*` reserved field name.
pub fn is_reserved_prefix(name: &str) -> bool {
    name.starts_with("nsd_")
}
