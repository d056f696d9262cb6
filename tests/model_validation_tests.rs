use marketplace_portal::{
    gate::Denial,
    models::{ApprovalStatus, Role, SignInRequest, UnknownRole},
};

#[test]
fn roles_use_snake_case_on_the_wire() {
    assert_eq!(serde_json::to_string(&Role::SalesManager).unwrap(), r#""sales_manager""#);
    let role: Role = serde_json::from_str(r#""brand""#).unwrap();
    assert_eq!(role, Role::Brand);

    // The closed set rejects anything else.
    assert!(serde_json::from_str::<Role>(r#""owner""#).is_err());
}

#[test]
fn role_display_and_parse_agree() {
    for role in Role::ALL {
        assert_eq!(role.to_string().parse::<Role>(), Ok(role));
    }
    assert_eq!("manager".parse::<Role>(), Err(UnknownRole("manager".to_string())));
}

#[test]
fn approval_status_wire_format() {
    let status: ApprovalStatus = serde_json::from_str(r#""pending""#).unwrap();
    assert_eq!(status, ApprovalStatus::Pending);
    assert_eq!(serde_json::to_string(&ApprovalStatus::Rejected).unwrap(), r#""rejected""#);
}

#[test]
fn sign_in_request_uses_return_to_key() {
    let req: SignInRequest = serde_json::from_str(
        r#"{"email":"a@b.test","password":"x","returnTo":"/dashboard"}"#,
    )
    .unwrap();
    assert_eq!(req.return_to.as_deref(), Some("/dashboard"));

    // returnTo is optional and omitted when absent.
    let req: SignInRequest = serde_json::from_str(r#"{"email":"a@b.test","password":"x"}"#).unwrap();
    let json = serde_json::to_string(&req).unwrap();
    assert!(!json.contains("returnTo"));
}

#[test]
fn denials_serialize_as_reason_labels() {
    assert_eq!(
        serde_json::to_string(&Denial::RoleNotPermitted).unwrap(),
        r#""role_not_permitted""#
    );
    assert_eq!(Denial::PendingApproval.to_string(), "account pending approval");
}
