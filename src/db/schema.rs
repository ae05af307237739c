// Diesel schema for the race tables. Kept in sync with `migrations/`.

diesel::table! {
    game_sessions (id) {
        id -> Text,
        code -> Text,
        player1_id -> Nullable<BigInt>,
        player1_name -> Nullable<Text>,
        player2_id -> Nullable<BigInt>,
        player2_name -> Nullable<Text>,
        puzzle -> Text,
        solution -> Text,
        player1_board -> Text,
        player2_board -> Text,
        difficulty -> Text,
        status -> Text,
        start_time -> Nullable<Timestamp>,
        created_at -> Timestamp,
    }
}

diesel::table! {
    moves (id) {
        id -> Integer,
        session_code -> Text,
        player_id -> BigInt,
        row -> Integer,
        col -> Integer,
        value -> Integer,
        valid_at_submission -> Bool,
        created_at -> Timestamp,
    }
}

diesel::table! {
    game_results (id) {
        id -> Integer,
        session_code -> Text,
        winner_id -> BigInt,
        winner_name -> Text,
        loser_id -> Nullable<BigInt>,
        loser_name -> Nullable<Text>,
        winner_time_secs -> BigInt,
        loser_time_secs -> Nullable<BigInt>,
        difficulty -> Text,
        result_type -> Text,
        created_at -> Timestamp,
    }
}

diesel::allow_tables_to_appear_in_same_query!(game_sessions, moves, game_results);
