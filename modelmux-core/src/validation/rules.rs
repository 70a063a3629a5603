//! Pure validators turning drafts into typed records.
//!
//! Each validator checks the whole draft and reports every violation it
//! finds; it never touches storage.

use std::str::FromStr;

use url::Url;

use crate::composites::{CompositeDraft, CompositeModel};
use crate::error::ParseEnumError;
use crate::models::{Model, ModelDraft, ModelFormat, ModelType};
use crate::providers::{Provider, ProviderDraft, ProviderFormat};

use super::{required_text, ConfigIndex, CustomJson, ValidationErrors, ViolationKind};

/// Validate a provider draft that will be stored under `id`.
pub fn validate_provider(
    id: &str,
    draft: &ProviderDraft,
    index: &ConfigIndex,
) -> Result<Provider, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let name = required_text(&mut errors, "provider_name", &draft.provider_name);
    if let Some(name) = &name {
        if index.provider_name_owner(name).is_some_and(|owner| owner != id) {
            errors.push(
                "provider_name",
                ViolationKind::Duplicate,
                format!("provider name '{name}' is already in use"),
            );
        }
    }

    let base_url = required_text(&mut errors, "api_base_url", &draft.api_base_url);
    if let Some(url) = &base_url {
        check_http_url(&mut errors, "api_base_url", url);
    }

    let address = required_text(
        &mut errors,
        "api_request_address",
        &draft.api_request_address,
    );
    let format: Option<ProviderFormat> =
        parse_enum(&mut errors, "provider_format", &draft.provider_format);

    match (name, base_url, address, format) {
        (Some(provider_name), Some(api_base_url), Some(api_request_address), Some(format))
            if errors.is_empty() =>
        {
            Ok(Provider {
                id: id.to_string(),
                provider_name,
                api_key: draft.api_key.trim().to_string(),
                api_base_url,
                api_request_address,
                provider_format: format,
                is_proxy_open: draft.is_proxy_open,
                is_valid: draft.is_valid,
            })
        }
        _ => Err(errors),
    }
}

/// Validate a model draft that will be stored under `id`.
pub fn validate_model(
    id: &str,
    draft: &ModelDraft,
    index: &ConfigIndex,
) -> Result<Model, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let name = required_text(&mut errors, "model_name", &draft.model_name);
    let model_id = required_text(&mut errors, "model_id", &draft.model_id);

    let provider_id = required_text(&mut errors, "provider_id", &draft.provider_id);
    if let Some(provider_id) = &provider_id {
        if !index.has_provider(provider_id) {
            errors.push(
                "provider_id",
                ViolationKind::UnknownReference,
                format!("no provider with id '{provider_id}'"),
            );
        }
    }

    let model_type: Option<ModelType> = parse_enum(&mut errors, "model_type", &draft.model_type);
    let model_format: Option<ModelFormat> =
        parse_enum(&mut errors, "model_format", &draft.model_format);

    let custom_json = match CustomJson::from_input(draft.model_custom_json.as_ref()) {
        Ok(custom) => custom,
        Err(e) => {
            errors.push(
                "model_custom_json",
                ViolationKind::InvalidValue,
                format!("model_custom_json must be a JSON object: {e}"),
            );
            None
        }
    };

    if let Some(ty) = model_type {
        if let Some(name) = &name {
            if index.model_name_owner(ty, name).is_some_and(|owner| owner != id) {
                errors.push(
                    "model_name",
                    ViolationKind::Duplicate,
                    format!("{ty} model name '{name}' is already in use"),
                );
            }
        }

        if draft.is_origin_reasoning && ty == ModelType::General {
            errors.push(
                "is_origin_reasoning",
                ViolationKind::InvalidValue,
                "is_origin_reasoning only applies to reasoner models",
            );
        }

        for (role, composite) in index.composite_roles(id) {
            if *role != ty {
                errors.push(
                    "model_type",
                    ViolationKind::WrongReferenceType,
                    format!("model is the {role} side of composite '{composite}'"),
                );
            }
        }
    }

    match (name, model_id, provider_id, model_type, model_format) {
        (Some(model_name), Some(model_id), Some(provider_id), Some(model_type), Some(model_format))
            if errors.is_empty() =>
        {
            Ok(Model {
                id: id.to_string(),
                model_name,
                model_id,
                provider_id,
                model_type,
                model_format,
                model_custom_json: custom_json,
                is_origin_reasoning: draft.is_origin_reasoning,
                is_origin_output: draft.is_origin_output,
                is_valid: draft.is_valid,
            })
        }
        _ => Err(errors),
    }
}

/// Validate a composite draft that will be stored under `id`.
pub fn validate_composite(
    id: &str,
    draft: &CompositeDraft,
    index: &ConfigIndex,
) -> Result<CompositeModel, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let name = required_text(&mut errors, "model_name", &draft.model_name);
    if let Some(name) = &name {
        if index.composite_name_owner(name).is_some_and(|owner| owner != id) {
            errors.push(
                "model_name",
                ViolationKind::Duplicate,
                format!("composite model name '{name}' is already in use"),
            );
        }
    }

    let reasoner = check_model_ref(
        &mut errors,
        index,
        "reasoner_model_id",
        &draft.reasoner_model_id,
        ModelType::Reasoner,
    );
    let general = check_model_ref(
        &mut errors,
        index,
        "general_model_id",
        &draft.general_model_id,
        ModelType::General,
    );

    match (name, reasoner, general) {
        (Some(model_name), Some(reasoner_model_id), Some(general_model_id))
            if errors.is_empty() =>
        {
            Ok(CompositeModel {
                id: id.to_string(),
                model_name,
                reasoner_model_id,
                general_model_id,
                is_valid: draft.is_valid,
            })
        }
        _ => Err(errors),
    }
}

fn check_model_ref(
    errors: &mut ValidationErrors,
    index: &ConfigIndex,
    field: &str,
    raw: &str,
    expected: ModelType,
) -> Option<String> {
    let model_id = required_text(errors, field, raw)?;
    match index.model_type(&model_id) {
        None => {
            errors.push(
                field,
                ViolationKind::UnknownReference,
                format!("no model with id '{model_id}'"),
            );
            None
        }
        Some(actual) if actual != expected => {
            errors.push(
                field,
                ViolationKind::WrongReferenceType,
                format!("model '{model_id}' is a {actual} model, expected {expected}"),
            );
            None
        }
        Some(_) => Some(model_id),
    }
}

fn parse_enum<T>(errors: &mut ValidationErrors, field: &str, raw: &str) -> Option<T>
where
    T: FromStr<Err = ParseEnumError>,
{
    if raw.trim().is_empty() {
        errors.push(field, ViolationKind::Required, format!("{field} is required"));
        return None;
    }
    match raw.parse() {
        Ok(value) => Some(value),
        Err(e) => {
            errors.push(field, ViolationKind::InvalidValue, e.to_string());
            None
        }
    }
}

fn check_http_url(errors: &mut ValidationErrors, field: &str, raw: &str) {
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
        Ok(url) => errors.push(
            field,
            ViolationKind::InvalidValue,
            format!("{field} must be an http(s) URL, got scheme '{}'", url.scheme()),
        ),
        Err(e) => errors.push(
            field,
            ViolationKind::InvalidValue,
            format!("{field} is not a valid URL: {e}"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn index() -> ConfigIndex {
        let mut index = ConfigIndex::new();
        index.add_provider("p1", "deepseek");
        index.add_model("r1", ModelType::Reasoner, "deepseek-r1");
        index.add_model("g1", ModelType::General, "gpt-4o");
        index.add_composite("c1", "r1-gpt", "r1", "g1");
        index
    }

    fn provider_draft() -> ProviderDraft {
        ProviderDraft {
            provider_name: "openai".to_string(),
            api_key: "sk-x".to_string(),
            api_base_url: "https://api.openai.com".to_string(),
            api_request_address: "/v1/chat/completions".to_string(),
            provider_format: "openai".to_string(),
            ..Default::default()
        }
    }

    fn model_draft() -> ModelDraft {
        ModelDraft {
            model_name: "claude".to_string(),
            model_id: "claude-sonnet".to_string(),
            provider_id: "p1".to_string(),
            model_type: "general".to_string(),
            model_format: "anthropic".to_string(),
            ..Default::default()
        }
    }

    // -------------------------------------------------------------------------
    // Provider
    // -------------------------------------------------------------------------

    #[test]
    fn test_provider_valid() {
        let provider = validate_provider("p2", &provider_draft(), &index()).unwrap();
        assert_eq!(provider.id, "p2");
        assert_eq!(provider.provider_format, ProviderFormat::Openai);
    }

    #[test]
    fn test_provider_name_trimmed_and_unique() {
        let mut draft = provider_draft();
        draft.provider_name = "  deepseek ".to_string();

        let errors = validate_provider("p2", &draft, &index()).unwrap_err();
        assert!(errors.all_of_kind(ViolationKind::Duplicate));

        // the owner itself may keep its name
        let provider = validate_provider("p1", &draft, &index()).unwrap();
        assert_eq!(provider.provider_name, "deepseek");
    }

    #[test]
    fn test_provider_rejects_non_http_url() {
        let mut draft = provider_draft();
        draft.api_base_url = "ftp://files.example.com".to_string();
        let errors = validate_provider("p2", &draft, &index()).unwrap_err();
        assert!(errors.has_field("api_base_url"));

        draft.api_base_url = "api.openai.com".to_string();
        let errors = validate_provider("p2", &draft, &index()).unwrap_err();
        assert!(errors.has_field("api_base_url"));
    }

    #[test]
    fn test_provider_empty_api_key_allowed() {
        let mut draft = provider_draft();
        draft.api_key = String::new();
        assert!(validate_provider("p2", &draft, &index()).is_ok());
    }

    // -------------------------------------------------------------------------
    // Model
    // -------------------------------------------------------------------------

    #[test]
    fn test_model_valid_with_custom_json() {
        let mut draft = model_draft();
        draft.model_custom_json = Some(json!("{\"a\":1}"));
        let model = validate_model("g2", &draft, &index()).unwrap();
        assert_eq!(model.model_custom_json.unwrap().get("a"), Some(&json!(1)));
    }

    #[test]
    fn test_model_custom_json_rejections() {
        for bad in [json!("not-json-object"), json!("[1,2]"), json!(5), json!("null")] {
            let mut draft = model_draft();
            draft.model_custom_json = Some(bad);
            let errors = validate_model("g2", &draft, &index()).unwrap_err();
            assert!(errors.has_field("model_custom_json"));
        }
    }

    #[test]
    fn test_model_collects_every_violation() {
        let draft = ModelDraft {
            provider_id: "ghost".to_string(),
            model_type: "chat".to_string(),
            model_format: "google".to_string(),
            ..Default::default()
        };
        let errors = validate_model("m9", &draft, &index()).unwrap_err();

        for field in [
            "model_name",
            "model_id",
            "provider_id",
            "model_type",
            "model_format",
        ] {
            assert!(errors.has_field(field), "missing violation for {field}");
        }
    }

    #[test]
    fn test_model_origin_reasoning_only_on_reasoners() {
        let mut draft = model_draft();
        draft.is_origin_reasoning = true;
        let errors = validate_model("g2", &draft, &index()).unwrap_err();
        assert!(errors.has_field("is_origin_reasoning"));

        draft.model_type = "reasoner".to_string();
        assert!(validate_model("r2", &draft, &index()).is_ok());
    }

    #[test]
    fn test_model_type_change_breaks_composite() {
        let mut draft = model_draft();
        draft.model_name = "deepseek-r1".to_string();
        draft.model_type = "general".to_string();

        let errors = validate_model("r1", &draft, &index()).unwrap_err();
        assert!(errors
            .iter()
            .any(|v| v.field == "model_type" && v.kind == ViolationKind::WrongReferenceType));
    }

    // -------------------------------------------------------------------------
    // Composite
    // -------------------------------------------------------------------------

    #[test]
    fn test_composite_valid() {
        let draft = CompositeDraft {
            model_name: "another".to_string(),
            reasoner_model_id: "r1".to_string(),
            general_model_id: "g1".to_string(),
            ..Default::default()
        };
        assert!(validate_composite("c2", &draft, &index()).is_ok());
    }

    #[test]
    fn test_composite_wrong_and_unknown_refs() {
        let draft = CompositeDraft {
            model_name: "r1-gpt".to_string(),
            reasoner_model_id: "g1".to_string(),
            general_model_id: "missing".to_string(),
            ..Default::default()
        };
        let errors = validate_composite("c2", &draft, &index()).unwrap_err();

        let kinds: Vec<(&str, ViolationKind)> = errors
            .iter()
            .map(|v| (v.field.as_str(), v.kind))
            .collect();
        assert!(kinds.contains(&("model_name", ViolationKind::Duplicate)));
        assert!(kinds.contains(&("reasoner_model_id", ViolationKind::WrongReferenceType)));
        assert!(kinds.contains(&("general_model_id", ViolationKind::UnknownReference)));
    }
}
