diesel::table! {
    users (id) {
        id -> Uuid,
        username -> Text,
        full_name -> Text,
        email -> Text,
        is_active -> Bool,
        created_at -> Timestamptz,
    }
}
