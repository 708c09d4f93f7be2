//! Diesel table definitions mirroring spec.md §3/§6.
//!
//! Hand-written rather than generated by `diesel print-schema`, in the style of a
//! repository that checks its schema into source control alongside the migrations
//! that produce it (see `migrations/`).

diesel::table! {
    y_profiles (id) {
        id -> Uuid,
        biosample_id -> Uuid,
        consensus_haplogroup -> Nullable<Text>,
        total_variants -> Int4,
        confirmed_count -> Int4,
        novel_count -> Int4,
        conflict_count -> Int4,
        no_coverage_count -> Int4,
        str_marker_count -> Int4,
        str_confirmed_count -> Int4,
        source_count -> Int4,
        primary_source_type -> Nullable<Text>,
        callable_region_pct -> Nullable<Float8>,
        mean_coverage -> Nullable<Float8>,
        last_reconciled_at -> Nullable<Timestamptz>,
        sync_status -> Text,
        at_uri -> Nullable<Text>,
        version -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    y_profile_sources (id) {
        id -> Uuid,
        profile_id -> Uuid,
        source_type -> Text,
        vendor -> Nullable<Text>,
        test_name -> Nullable<Text>,
        reference_build -> Nullable<Text>,
        method_tier -> Int4,
        base_concordance_weight -> Float8,
        version -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    y_profile_variants (id) {
        id -> Uuid,
        profile_id -> Uuid,
        position -> Int8,
        end_position -> Nullable<Int8>,
        ref_allele -> Text,
        alt_allele -> Text,
        variant_type -> Text,
        variant_name -> Nullable<Text>,
        marker_name -> Nullable<Text>,
        is_in_tree -> Bool,
        consensus_allele -> Nullable<Text>,
        consensus_state -> Nullable<Text>,
        status -> Text,
        confidence_score -> Float8,
        concordant_count -> Int4,
        discordant_count -> Int4,
        source_count -> Int4,
        version -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    y_variant_source_calls (id) {
        id -> Uuid,
        variant_id -> Uuid,
        source_id -> Uuid,
        called_allele -> Text,
        call_state -> Text,
        called_repeat_count -> Nullable<Int4>,
        read_depth -> Nullable<Int4>,
        mapping_quality -> Nullable<Int4>,
        variant_allele_frequency -> Nullable<Float8>,
        callable_state -> Nullable<Text>,
        concordance_weight -> Float8,
        version -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    y_source_call_alignments (id) {
        id -> Uuid,
        source_call_id -> Uuid,
        reference_build -> Text,
        position -> Int8,
        ref_allele -> Nullable<Text>,
        alt_allele -> Nullable<Text>,
        called_allele -> Nullable<Text>,
        read_depth -> Nullable<Int4>,
        mapping_quality -> Nullable<Int4>,
        version -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    y_profile_regions (id) {
        id -> Uuid,
        profile_id -> Uuid,
        source_id -> Uuid,
        contig -> Text,
        start_position -> Int8,
        end_position -> Int8,
        callable_state -> Text,
        mean_coverage -> Nullable<Float8>,
        mean_mapping_quality -> Nullable<Float8>,
        version -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    y_variant_audits (id) {
        id -> Uuid,
        variant_id -> Uuid,
        timestamp -> Timestamptz,
        action -> Text,
        prior_consensus_allele -> Nullable<Text>,
        prior_consensus_state -> Nullable<Text>,
        prior_status -> Nullable<Text>,
        new_consensus_allele -> Nullable<Text>,
        new_consensus_state -> Nullable<Text>,
        new_status -> Nullable<Text>,
        reason -> Text,
        user_id -> Nullable<Text>,
    }
}

diesel::joinable!(y_profile_sources -> y_profiles (profile_id));
diesel::joinable!(y_profile_variants -> y_profiles (profile_id));
diesel::joinable!(y_profile_regions -> y_profiles (profile_id));
diesel::joinable!(y_profile_regions -> y_profile_sources (source_id));
diesel::joinable!(y_variant_source_calls -> y_profile_variants (variant_id));
diesel::joinable!(y_variant_source_calls -> y_profile_sources (source_id));
diesel::joinable!(y_source_call_alignments -> y_variant_source_calls (source_call_id));
diesel::joinable!(y_variant_audits -> y_profile_variants (variant_id));

diesel::allow_tables_to_appear_in_same_query!(
    y_profiles,
    y_profile_sources,
    y_profile_variants,
    y_variant_source_calls,
    y_source_call_alignments,
    y_profile_regions,
    y_variant_audits,
);
