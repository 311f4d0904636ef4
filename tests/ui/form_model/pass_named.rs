use calmform::form::{FieldKey, FormModel};

#[derive(Clone, Default, calmform::form::FormModel)]
struct ProfileForm {
    display_name: String,
    bio: String,
}

fn main() {
    let keys: Vec<_> = ProfileForm::field_keys()
        .iter()
        .map(|key| key.as_str())
        .collect();
    assert_eq!(keys, ["display_name", "bio"]);

    let mut model = ProfileForm::default();
    let key = FieldKey::parse::<ProfileForm>("bio").unwrap();
    assert!(model.set_value(key, "Reads a lot".to_string()));
    assert_eq!(model.value(key), Some("Reads a lot"));
    assert_eq!(FieldKey::parse::<ProfileForm>("avatar"), None);
}
