//! Ownership rule tests.

use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use subtrack_core::{check_permission, Account, FamilyId, Owner, Role, SubtrackError, UserId};

fn owner_personal(id: &'static str) -> Owner {
    Owner::Personal(UserId::from(id))
}

fn owner_family(id: &'static str) -> Owner {
    Owner::Family(FamilyId::from(id))
}

#[test]
fn admin_bypasses_every_owner() {
    let admin = Account::new("admin-1", "free").with_role(Role::Admin);
    for owner in [Owner::System, owner_family("fam-9"), owner_personal("someone")] {
        assert_eq!(check_permission(&admin, &owner), Ok(()), "owner {owner}");
    }
}

#[test]
fn personal_owner_must_match_user() {
    let user = Account::new("user-1", "free");
    assert_ok!(check_permission(&user, &owner_personal("user-1")));

    let err = check_permission(&user, &owner_personal("user-2")).unwrap_err();
    assert!(matches!(err, SubtrackError::Unauthorized(_)));
}

#[test]
fn system_owner_denies_non_admin() {
    let user = Account::new("user-1", "premium").with_family("fam-1");
    assert_err!(check_permission(&user, &Owner::System));
}

#[test]
fn family_owner_must_match_family() {
    let member = Account::new("user-1", "free").with_family("fam-1");
    assert_ok!(check_permission(&member, &owner_family("fam-1")));
    assert_err!(check_permission(&member, &owner_family("fam-2")));

    let loner = Account::new("user-2", "free");
    assert_err!(check_permission(&loner, &owner_family("fam-1")));
}

#[test]
fn owner_accessors_are_variant_specific() {
    assert_eq!(owner_family("fam-1").user_id(), None);
    assert_eq!(owner_personal("user-1").family_id(), None);
    assert_eq!(owner_personal("user-1").user_id(), Some(&UserId::from("user-1")));
    assert!(Owner::System.is_system());
}

#[test]
fn owner_serializes_as_tagged_value() {
    assert_eq!(serde_json::to_value(Owner::System).unwrap(), json!({"type": "system"}));
    assert_eq!(
        serde_json::to_value(owner_family("fam-1")).unwrap(),
        json!({"type": "family", "id": "fam-1"})
    );

    let parsed: Owner = serde_json::from_value(json!({"type": "personal", "id": "user-7"})).unwrap();
    assert_eq!(parsed, owner_personal("user-7"));
}
