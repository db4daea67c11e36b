//! KeyEvent - a notable event in a site's history

use crate::error::SchemaError;
use crate::model::Attribute;
use crate::schema::validators::is_iso_date;
use crate::schema::{AttributeSpec, ReferenceOptions, ReferenceType, Schema};
use crate::value::now_iso;

pub const ENTITY: &str = "KeyEvent";

string_enum! {
    KeyEventType {
        Performance => "PERFORMANCE",
        Seo => "SEO",
        Content => "CONTENT",
        Code => "CODE",
        ThirdParty => "THIRD PARTY",
        Experimentation => "EXPERIMENTATION",
        Network => "NETWORK",
        Status => "STATUS CHANGE",
    }
}

pub const NAME: Attribute<String> = Attribute::new("name");
pub const TYPE: Attribute<KeyEventType> = Attribute::new("type");
pub const TIME: Attribute<String> = Attribute::new("time");

pub fn schema() -> Result<Schema, SchemaError> {
    Schema::builder(ENTITY)
        .add_attribute("name", AttributeSpec::string().required())
        .add_attribute(
            "type",
            AttributeSpec::enumeration(KeyEventType::VALUES.iter().copied()).required(),
        )
        .add_attribute(
            "time",
            AttributeSpec::string()
                .required()
                .default_with(|| now_iso().into())
                .validate(is_iso_date),
        )
        .add_reference(
            ReferenceType::BelongsTo,
            "Site",
            vec!["time".to_string()],
            ReferenceOptions::new().required(true),
        )
        .build()
}
