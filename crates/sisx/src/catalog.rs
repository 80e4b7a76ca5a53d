//! 📚 Query Catalog: every SQL statement this crate will ever send, in one place.
//!
//! 🎬 INT. DATA WAREHOUSE, NIGHT. A row count ticks upward. Somewhere a DBA sleeps,
//! unaware that 120,000 rows are about to be politely requested, again.
//!
//! 🧠 Knowledge graph:
//! - Pure functions returning SQL strings. No I/O, no state, no surprises.
//! - Two shapes: [`Query::Static`] (one statement) and [`Query::Batched`] (a closure
//!   `(batch_number, batch_size) -> SQL` for ROWNUM pagination)
//! - Consumed by `jobs::Job`, which owns connections, cursors and artifacts.
//!
//! ⚠️ Parameters are spliced in with `format!`. Every interpolated value comes from
//! inside the house (term ids the database gave us, dates we computed, integers).
//! If a parameter ever starts arriving from outside, switch to bind variables.

use std::fmt;

use chrono::NaiveDateTime;

/// 📦 Builds the SQL for one window of a paginated query.
pub type BatchFn = dyn Fn(u64, u64) -> String + Send + Sync;

/// 📄 A query in one of its two shapes.
pub enum Query {
    Static(String),
    Batched(BatchedQuery),
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(sql) => f.debug_tuple("Static").field(&sql.len()).finish(),
            Self::Batched(batched) => batched.fmt(f),
        }
    }
}

/// 🔁 A paginated query: give it a batch number and a batch size, get back SQL for
/// the row window `(n*size, n*size + size]`.
pub struct BatchedQuery {
    build: Box<BatchFn>,
}

impl fmt::Debug for BatchedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // -- 🎭 closures don't do Debug. we do our best impression.
        f.write_str("BatchedQuery(<fn>)")
    }
}

impl BatchedQuery {
    pub fn new(build: impl Fn(u64, u64) -> String + Send + Sync + 'static) -> Self {
        Self {
            build: Box::new(build),
        }
    }

    pub fn sql(&self, batch_number: u64, batch_size: u64) -> String {
        (self.build)(batch_number, batch_size)
    }
}

/// 📐 `(exclusive minimum, inclusive maximum)` row numbers of one batch window.
pub fn batch_window(batch_number: u64, batch_size: u64) -> (u64, u64) {
    let minimum_row_exclusive = batch_number * batch_size;
    (minimum_row_exclusive, minimum_row_exclusive + batch_size)
}

/// 🕰️ Render a recency cutoff the way Oracle wants to parse it back.
pub fn cutoff_literal(cutoff: NaiveDateTime) -> String {
    format!(
        "to_timestamp('{}', 'yyyy-mm-dd hh24:mi:ss')",
        cutoff.format("%Y-%m-%d %H:%M:%S")
    )
}

/// 🚫 Drops, and late withdrawals recorded only on the primary section.
///
/// Secondary sections never get the `W` grade themselves, so for `NON` grading basis
/// rows the CASE looks up the primary section's grade instead.
pub const OMIT_DROPS_AND_WITHDRAWALS: &str = r#"
    enroll.STDNT_ENRL_STATUS_CODE != 'D' AND
    CASE enroll.GRADING_BASIS_CODE
    WHEN 'NON' THEN (
        SELECT MIN(prim_enr.GRADE_MARK)
        FROM SISEDO.CLASSSECTIONALLV01_MVW sec
        LEFT JOIN SISEDO.ETS_ENROLLMENTV01_VW prim_enr
            ON prim_enr.CLASS_SECTION_ID = sec."primaryAssociatedSectionId"
            AND prim_enr.TERM_ID = enroll.TERM_ID
            AND prim_enr.STUDENT_ID = enroll.STUDENT_ID
            AND prim_enr.STDNT_ENRL_STATUS_CODE != 'D'
         WHERE sec."id" = enroll.CLASS_SECTION_ID
            AND sec."term-id" = enroll.TERM_ID
            AND prim_enr.STUDENT_ID IS NOT NULL
    )
    ELSE enroll.GRADE_MARK END != 'W'"#;

pub fn advisor_notes_access() -> Query {
    Query::Static(
        r#"
        SELECT
            A.USER_ID,
            A.CS_ID,
            A.PERMISSION_LIST
        FROM SYSADM.BOA_ADV_NOTES_ACCESS_VW A"#
            .to_string(),
    )
}

pub fn instructor_advisor_relationships() -> Query {
    Query::Static(
        r#"
        SELECT DISTINCT
            I.ADVISOR_ID,
            I.CAMPUS_ID,
            I.INSTRUCTOR_ADISOR_NUMBER AS INSTRUCTOR_ADVISOR_NBR,
            I.ADVISOR_TYPE,
            I.ADVISOR_TYPE_DESCR,
            I.INSTRUCTOR_TYPE,
            I.INSTRUCTOR_TYPE_DESCR,
            I.ACADEMIC_PROGRAM,
            I.ACADEMIC_PROGRAM_DESCR,
            I.ACADEMIC_PLAN,
            I.ACADEMIC_PLAN_DESCR,
            I.ACADEMIC_SUB_PLAN,
            I.ACADEMIC_SUB_PLAN_DESCR
        FROM SYSADM.BOA_INSTRUCTOR_ADVISOR_VW I
        WHERE I.INSTITUTION = 'UCB01'
            AND I.ACADEMIC_CAREER = 'UGRD'
            AND I.EFFECTIVE_STATUS = 'A'
            AND I.EFFECTIVE_DATE = (
                SELECT MAX(I1.EFFECTIVE_DATE)
                FROM SYSADM.BOA_INSTRUCTOR_ADVISOR_VW I1
                WHERE I1.ADVISOR_ID = I.ADVISOR_ID
                AND I1.INSTRUCTOR_ADISOR_NUMBER = I.INSTRUCTOR_ADISOR_NUMBER
            )"#
        .to_string(),
    )
}

/// 🗓️ The undergraduate term in progress plus the ones after it, capped at `limit`.
///
/// Deciding which of these are really "current" is the downstream consumer's problem.
pub fn current_terms(limit: u32) -> Query {
    Query::Static(format!(
        r#"
        SELECT * FROM (
            SELECT DISTINCT term_id FROM SISEDO.CLC_TERMV00_VW WHERE term_id >= (
                SELECT MAX(term_id) from SISEDO.CLC_TERMV00_VW where term_id < (
                    SELECT MIN(term_id)
                    FROM SISEDO.CLC_TERMV00_VW
                    WHERE institution = 'UCB01' AND
                        acadcareer_code = 'UGRD' AND
                        term_type IS NOT NULL AND
                        term_begin_dt > CURRENT_DATE
                )
            ) ORDER BY term_id
        ) WHERE rownum <= {limit}"#
    ))
}

pub fn recent_instructor_updates(term_id: &str, cutoff: NaiveDateTime) -> Query {
    let cutoff = cutoff_literal(cutoff);
    Query::Static(format!(
        r#"
        SELECT DISTINCT
            up.instr_id AS sis_id,
            up.term_id,
            up.class_section_id AS section_id,
            up.crse_id AS course_id,
            instr."campus-uid" AS ldap_uid,
            instr."role-code" AS role_code,
            sec."primary",
            up.last_updated
            FROM SISEDO.CLASS_INSTR_UPDATESV00_VW up
            JOIN SISEDO.ASSIGNEDINSTRUCTORV00_VW instr ON (
                instr."cs-course-id" = up.crse_id AND
                instr."term-id" = up.term_id AND
                instr."session-id" = up.session_code AND
                instr."offeringNumber" = up.crse_offer_nbr AND
                instr."number" = up.class_section
            )
            JOIN SISEDO.CLASSSECTIONALLV01_MVW sec ON (
                sec."id" = up.class_section_id AND sec."term-id" = up.term_id
            )
            WHERE up.change_type IN ('C', 'U') AND up.term_id= {term_id} AND
            up.last_updated >= {cutoff}
            ORDER BY up.term_id, up.crse_id, up.class_section_id, instr."campus-uid", up.last_updated DESC"#
    ))
}

pub fn recent_enrollment_updates(term_id: &str, cutoff: NaiveDateTime) -> Query {
    let cutoff = cutoff_literal(cutoff);
    Query::Static(format!(
        r#"
        SELECT DISTINCT
            enroll.CLASS_SECTION_ID as section_id,
            enroll.TERM_ID as term_id,
            enroll.CAMPUS_UID AS ldap_uid,
            enroll.STUDENT_ID AS sis_id,
            enroll.STDNT_ENRL_STATUS_CODE AS enroll_status,
            enroll.COURSE_CAREER AS course_career,
            enroll.LAST_UPDATED as last_updated
        FROM SISEDO.ETS_ENROLLMENTV01_VW enroll
        WHERE enroll.TERM_ID = {term_id}
        AND {OMIT_DROPS_AND_WITHDRAWALS}
        AND enroll.last_updated >= {cutoff}
        ORDER BY enroll.TERM_ID,
            -- If results exceed the downstream processing cutoff, prioritize within a
            -- term by the course's academic career.
            CASE
                WHEN enroll.course_career = 'UGRD' THEN 1
                WHEN enroll.course_career = 'GRAD' THEN 2
                WHEN enroll.course_career = 'LAW' THEN 3
                WHEN enroll.course_career = 'UCBX' THEN 4
                ELSE 5
            END,
            enroll.CLASS_SECTION_ID, enroll.CAMPUS_UID, enroll.last_updated DESC"#
    ))
}

pub fn term_courses(term_id: &str) -> Query {
    Query::Static(format!(
        r#"
        SELECT DISTINCT
            TO_CHAR(CLASS_NBR) AS section_id,
            STRM AS term_id,
            SESSION_CODE AS session_id,
            SUBJECT AS dept_name,
            SUBJECT AS dept_code,
            ACAD_CAREER AS course_career_code,
            SCHEDULE_PRINT AS print_in_schedule_of_classes,
            CASE WHEN PRIMARY_FLAG = 'Y' THEN 'true' ELSE 'false' END AS primary,
            SSR_COMPONENT as instruction_format,
            TO_CHAR(CLASS_NBR_1) as primary_associated_section_id,
            TRIM(DISPLAY_NAME) AS display_name,
            CLASS_SECTION AS section_num,
            TRIM(CATALOG_NBR) AS catalog_id,
            regexp_replace(trim(CATALOG_NBR), '[A-Za-z]') AS catalog_root,
            REPLACE(SUBSTR(REPLACE(trim(CATALOG_NBR),regexp_replace(trim(CATALOG_NBR), '[A-Za-z]'),'|'),1,1),'|','') AS catalog_prefix,
            SUBSTR(REPLACE(trim(CATALOG_NBR),regexp_replace(trim(CATALOG_NBR), '[A-Za-z]'),'|'),instr(REPLACE(trim(CATALOG_NBR),regexp_replace(trim(CATALOG_NBR), '[A-Za-z]'),'|'),'|')+1) AS catalog_suffix,
            EFFDT AS course_updated_date,
            CRSE_ID as course_id,
            CRSE_OFFER_NBR as course_offer_nbr,
            ENRL_TOT AS enrollment_count,
            ENRL_CAP AS enroll_limit,
            WAIT_CAP AS waitlist_limit,
            START_DT AS start_date,
            END_DT AS end_date,
            CAMPUS_ID AS instructor_uid,
            TRIM(
                TRIM(NAME_PREFIX) || ' ' ||
                TRIM(FIRST_NAME) || ' ' ||
                TRIM(MIDDLE_NAME) || NVL2(TRIM(MIDDLE_NAME), ' ', '') ||
                TRIM(LAST_NAME) || ' ' ||
                TRIM(NAME_SUFFIX)
            ) AS instructor_name,
            INSTR_ROLE AS instructor_role_code,
            DESCR AS location,
            CASE WHEN MON = 'Y' THEN 'MO' END ||
                CASE WHEN TUES = 'Y' THEN 'TU' END ||
                CASE WHEN WED = 'Y' THEN 'WE' END ||
                CASE WHEN THURS = 'Y' THEN 'TH' END ||
                CASE WHEN FRI = 'Y' THEN 'FR' END ||
                CASE WHEN SAT = 'Y' THEN 'SA' END ||
                CASE WHEN SUN = 'Y' THEN 'SU' END
            AS meeting_days,
            TO_CHAR(MEETING_TIME_START,'HH24:MI') AS meeting_start_time,
            TO_CHAR(MEETING_TIME_END,'HH24:MI') AS meeting_end_time,
            START_DATE AS meeting_start_date,
            END_DATE AS meeting_end_date,
            TRIM(REPLACE(REPLACE(COURSE_TITLE_LONG, CHR(10)), CHR(13))) AS course_title,
            COURSE_TITLE AS course_title_short,
            INSTRUCTION_MODE AS instruction_mode
        FROM SISEDO.BCOURSESV00_VW
        WHERE STRM = '{term_id}'"#
    ))
}

/// 👥 Every person with affiliations, paginated by `ldap_uid`.
///
/// Pagination is the nested-ROWNUM trick: number an ordered inner set, cap the
/// middle at the window's max, filter the outer by `rnum` above the window's min.
pub fn basic_attributes() -> Query {
    Query::Batched(BatchedQuery::new(|batch_number, batch_size| {
        let (minimum_row_exclusive, maximum_row_inclusive) = batch_window(batch_number, batch_size);
        format!(
            r#"
            SELECT ldap_uid, sid, first_name, last_name, email_address, affiliations, person_type, alternateid
                FROM (SELECT /*+ FIRST_ROWS(n) */ attributes.*, ROWNUM rnum
                    FROM (SELECT
                        pi.ldap_uid, pi.student_id AS sid, TRIM(pi.first_name) AS first_name, TRIM(pi.last_name) as last_name,
                        pi.email_address, pi.affiliations, pi.person_type, pi.alternateid
                        FROM SISEDO.CALCENTRAL_PERSON_INFO_VW pi
                        WHERE person_type != 'Z' AND affiliations IS NOT NULL
                        ORDER BY pi.ldap_uid
                    ) attributes
                WHERE ROWNUM <= {maximum_row_inclusive})
            WHERE rnum > {minimum_row_exclusive}"#
        )
    }))
}

pub fn term_enrollments(term_id: &str) -> Query {
    let term_id = term_id.to_string();
    Query::Batched(BatchedQuery::new(move |batch_number, batch_size| {
        let (minimum_row_exclusive, maximum_row_inclusive) = batch_window(batch_number, batch_size);
        format!(
            r#"
            SELECT section_id, term_id, session_id, ldap_uid, sis_id, enrollment_status, waitlist_position, units,
                    grade, grade_points, grading_basis, grade_midterm, institution FROM (
                SELECT /*+ FIRST_ROWS(n) */ enrollments.*, ROWNUM rnum FROM (
                    SELECT DISTINCT
                        enroll."CLASS_SECTION_ID" AS section_id,
                        enroll."TERM_ID" AS term_id,
                        enroll."SESSION_ID" AS session_id,
                        enroll."CAMPUS_UID" AS ldap_uid,
                        enroll."STUDENT_ID" AS sis_id,
                        enroll."STDNT_ENRL_STATUS_CODE" AS enrollment_status,
                        enroll."WAITLISTPOSITION" AS waitlist_position,
                        enroll."UNITS_TAKEN" AS units,
                        enroll."GRADE_MARK" AS grade,
                        enroll."GRADE_POINTS" AS grade_points,
                        enroll."GRADING_BASIS_CODE" AS grading_basis,
                        enroll."GRADE_MARK_MID" AS grade_midterm,
                        enroll."INSTITUTION" AS institution
                    FROM SISEDO.ETS_ENROLLMENTV01_VW enroll
                    WHERE enroll."TERM_ID" = '{term_id}'
                    ORDER BY section_id, sis_id
                ) enrollments
                WHERE ROWNUM <= {maximum_row_inclusive}
            )
            WHERE rnum > {minimum_row_exclusive}"#
        )
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn static_sql(query: Query) -> String {
        match query {
            Query::Static(sql) => sql,
            Query::Batched(_) => panic!("expected a static query, got a batched one"),
        }
    }

    fn batched(query: Query) -> BatchedQuery {
        match query {
            Query::Batched(b) => b,
            Query::Static(_) => panic!("expected a batched query, got a static one"),
        }
    }

    #[test]
    fn the_one_where_batch_windows_tile_without_gaps() {
        assert_eq!(batch_window(0, 120_000), (0, 120_000));
        assert_eq!(batch_window(1, 120_000), (120_000, 240_000));
        assert_eq!(batch_window(3, 10), (30, 40));
    }

    #[test]
    fn the_one_where_basic_attributes_paginates_by_rownum() {
        let sql = batched(basic_attributes()).sql(2, 100);
        assert!(sql.contains("WHERE ROWNUM <= 300)"));
        assert!(sql.contains("WHERE rnum > 200"));
        assert!(sql.contains("ORDER BY pi.ldap_uid"));
    }

    #[test]
    fn the_one_where_the_enrollment_closure_remembers_its_term() {
        let query = batched(term_enrollments("2248"));
        let first = query.sql(0, 5);
        let second = query.sql(1, 5);
        assert!(first.contains(r#"enroll."TERM_ID" = '2248'"#));
        assert!(first.contains("WHERE rnum > 0"));
        assert!(second.contains("WHERE ROWNUM <= 10"));
        assert!(second.contains("WHERE rnum > 5"));
    }

    #[test]
    fn the_one_where_recent_updates_carry_the_cutoff_and_the_withdrawal_filter() {
        let cutoff = NaiveDate::from_ymd_opt(2024, 1, 14)
            .unwrap()
            .and_hms_opt(4, 30, 0)
            .unwrap();
        let enrollments = static_sql(recent_enrollment_updates("2248", cutoff));
        assert!(enrollments.contains("enroll.TERM_ID = 2248"));
        assert!(enrollments.contains(
            "enroll.last_updated >= to_timestamp('2024-01-14 04:30:00', 'yyyy-mm-dd hh24:mi:ss')"
        ));
        assert!(enrollments.contains(OMIT_DROPS_AND_WITHDRAWALS));

        let instructors = static_sql(recent_instructor_updates("2248", cutoff));
        assert!(instructors.contains("up.term_id= 2248"));
        assert!(instructors.contains("to_timestamp('2024-01-14 04:30:00'"));
    }

    #[test]
    fn the_one_where_term_limits_and_term_ids_land_in_the_sql() {
        assert!(static_sql(current_terms(3)).ends_with("WHERE rownum <= 3"));
        assert!(static_sql(current_terms(5)).ends_with("WHERE rownum <= 5"));
        assert!(static_sql(term_courses("2252")).ends_with("WHERE STRM = '2252'"));
    }

    #[test]
    fn the_one_where_the_advisor_queries_are_static() {
        assert!(static_sql(advisor_notes_access()).contains("SYSADM.BOA_ADV_NOTES_ACCESS_VW"));
        assert!(static_sql(instructor_advisor_relationships()).contains("INSTRUCTOR_ADVISOR_NBR"));
    }
}
