diesel::table! {
    members (id) {
        id -> Text,
        name -> Text,
        email -> Text,
        phone -> Text,
        date_of_birth -> Nullable<BigInt>,
        profile_image -> Nullable<Text>,
        gender -> Nullable<Text>,
        address -> Nullable<Text>,
        emergency_contact -> Nullable<Text>,
        insurance_info -> Nullable<Text>,
        health_goals -> Text,
        current_conditions -> Text,
        medications -> Text,
        allergies -> Text,
        communication_preference -> Text,
        time_zone -> Text,
        preferred_contact_time -> Text,
        join_date -> BigInt,
        last_active -> BigInt,
        engagement_level -> Text,
        plan_adherence -> Integer,
        created_at -> BigInt,
        updated_at -> BigInt,
    }
}

diesel::table! {
    team_members (id) {
        id -> Text,
        name -> Text,
        role -> Text,
        title -> Text,
        avatar -> Nullable<Text>,
        communication_style -> Text,
        expertise -> Text,
        is_online -> Bool,
        response_time -> Integer,
        created_at -> BigInt,
        updated_at -> BigInt,
    }
}

diesel::table! {
    health_metrics (id) {
        id -> Text,
        member_id -> Text,
        metric_type -> Text,
        value -> Text,
        unit -> Text,
        timestamp -> BigInt,
        source -> Text,
        notes -> Nullable<Text>,
        created_at -> BigInt,
    }
}

diesel::table! {
    episodes (id) {
        id -> Text,
        member_id -> Text,
        title -> Text,
        description -> Text,
        category -> Text,
        priority -> Text,
        status -> Text,
        initiated_by -> Text,
        assigned_to -> Nullable<Text>,
        start_date -> BigInt,
        end_date -> Nullable<BigInt>,
        interventions -> Text,
        outcomes -> Text,
        friction_points -> Text,
        tags -> Text,
        created_at -> BigInt,
        updated_at -> BigInt,
    }
}

diesel::table! {
    conversations (id) {
        id -> Text,
        member_id -> Text,
        title -> Nullable<Text>,
        description -> Nullable<Text>,
        category -> Text,
        status -> Text,
        created_at -> BigInt,
        updated_at -> BigInt,
    }
}

diesel::table! {
    messages (id) {
        id -> Text,
        conversation_id -> Text,
        sender_id -> Text,
        sender_name -> Text,
        sender_role -> Text,
        content -> Text,
        timestamp -> BigInt,
        message_type -> Text,
        is_read -> Bool,
        sentiment -> Nullable<Text>,
        topics -> Text,
        action_items -> Text,
        created_at -> BigInt,
    }
}

diesel::joinable!(health_metrics -> members (member_id));
diesel::joinable!(episodes -> members (member_id));
diesel::joinable!(conversations -> members (member_id));
diesel::joinable!(messages -> conversations (conversation_id));

diesel::allow_tables_to_appear_in_same_query!(
    members,
    team_members,
    health_metrics,
    episodes,
    conversations,
    messages,
);
