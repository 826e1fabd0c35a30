//! The static transformer registry (spec §4.4). Unknown names resolve to
//! the identity transformer (`bag_copy`).
//!
//! Canonical keys: `bag_copy`, `content_clean`, `doc_type`, `field_mapper`,
//! `field_delete`, `field_collapse`, `pc_collapse`, `pc_composite`.
//! `field_collapse` and `pc_collapse` both construct the same single-level
//! collapse transformer (spec §4.4 "pc-collapse") under separate names, so a
//! deployment can keep two independently-configured instances in one
//! pipeline; `pc_composite` is the distinct multi-level
//! "parent-child-collapse" transformer (see DESIGN.md).

use crate::config::Settings;
use crate::error::CrawlResult;

use super::{
    BagCopy, ContentClean, DocTypeAssign, FieldDelete, FieldMapper, PcCollapse, PcComposite,
    Transformer,
};

pub const BAG_COPY: &str = "bag_copy";
pub const CONTENT_CLEAN: &str = "content_clean";
pub const DOC_TYPE: &str = "doc_type";
pub const FIELD_MAPPER: &str = "field_mapper";
pub const FIELD_DELETE: &str = "field_delete";
pub const FIELD_COLLAPSE: &str = "field_collapse";
pub const PC_COLLAPSE: &str = "pc_collapse";
pub const PC_COMPOSITE: &str = "pc_composite";

const KNOWN: &[&str] = &[
    BAG_COPY,
    CONTENT_CLEAN,
    DOC_TYPE,
    FIELD_MAPPER,
    FIELD_DELETE,
    FIELD_COLLAPSE,
    PC_COLLAPSE,
    PC_COMPOSITE,
];

pub fn is_known(name: &str) -> bool {
    KNOWN.contains(&name)
}

/// Construct the transformer for `name`, loading its configuration
/// (eagerly, read-only thereafter) from `settings`. Unknown names fall back
/// to `bag_copy`.
pub fn resolve(name: &str, settings: &Settings) -> CrawlResult<Box<dyn Transformer>> {
    let transformer: Box<dyn Transformer> = match name {
        CONTENT_CLEAN => Box::new(ContentClean::new()),
        DOC_TYPE => Box::new(DocTypeAssign::new(settings.transformer_file(DOC_TYPE))?),
        FIELD_MAPPER => Box::new(FieldMapper::new(settings.transformer_file(FIELD_MAPPER))?),
        FIELD_DELETE => Box::new(FieldDelete::new(settings.transformer_file(FIELD_DELETE))?),
        FIELD_COLLAPSE => Box::new(PcCollapse::new(
            FIELD_COLLAPSE,
            settings.transformer_file(FIELD_COLLAPSE),
            settings.extract.id_value_prefix.clone(),
        )?),
        PC_COLLAPSE => Box::new(PcCollapse::new(
            PC_COLLAPSE,
            settings.transformer_file(PC_COLLAPSE),
            settings.extract.id_value_prefix.clone(),
        )?),
        PC_COMPOSITE => Box::new(PcComposite::new(settings.transformer_file(PC_COMPOSITE))?),
        _ => Box::new(BagCopy::new()),
    };
    Ok(transformer)
}

/// Build the full pipeline from `settings.transform.pipe_line`, in order.
pub fn build_pipeline(settings: &Settings) -> CrawlResult<super::Pipeline> {
    let mut transformers = Vec::with_capacity(settings.transform.pipe_line.len());
    for name in &settings.transform.pipe_line {
        transformers.push(resolve(name, settings)?);
    }
    Ok(super::Pipeline::new(transformers))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_name_resolves_to_bag_copy() {
        let settings = Settings::from_config(crate::config::Config::default());
        let t = resolve("totally_unknown", &settings).unwrap();
        assert_eq!(t.name(), BAG_COPY);
    }
}
