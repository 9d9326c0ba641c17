use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        FxError::contract("x")
            .to_string()
            .contains("contract violation:")
    );
    assert!(
        FxError::resource("x")
            .to_string()
            .contains("resource error:")
    );
    assert!(
        FxError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        FxError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = FxError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
    assert!(!err.is_contract());
}

#[test]
fn contract_is_flagged() {
    assert!(FxError::contract("double release").is_contract());
    assert!(!FxError::resource("oom").is_contract());
}
