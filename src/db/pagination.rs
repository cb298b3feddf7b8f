use rusqlite::{Connection, Row, ToSql};

/// One page of a page-number paginated listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.page.saturating_mul(self.per_page) < self.total
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn next_num(&self) -> Option<i64> {
        self.has_next().then(|| self.page + 1)
    }

    pub fn prev_num(&self) -> Option<i64> {
        self.has_prev().then(|| self.page - 1)
    }
}

/// Run a counted, LIMIT/OFFSET query. `page_sql` must take the limit and the
/// offset as its last two positional parameters, after `args`.
pub(crate) fn fetch<T, F>(
    conn: &Connection,
    count_sql: &str,
    page_sql: &str,
    args: &[&dyn ToSql],
    page: i64,
    per_page: i64,
    map: F,
) -> rusqlite::Result<Page<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let page = page.max(1);
    let per_page = per_page.max(1);
    let offset = (page - 1).saturating_mul(per_page);

    let total: i64 = conn.query_row(count_sql, args, |row| row.get(0))?;

    let mut page_args: Vec<&dyn ToSql> = args.to_vec();
    page_args.push(&per_page);
    page_args.push(&offset);

    let mut stmt = conn.prepare(page_sql)?;
    let items = stmt
        .query_map(page_args.as_slice(), map)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page {
        items,
        page,
        per_page,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(page: i64, total: i64) -> Page<()> {
        Page {
            items: Vec::new(),
            page,
            per_page: 3,
            total,
        }
    }

    #[test]
    fn first_page_of_many() {
        let p = page(1, 7);
        assert!(p.has_next());
        assert!(!p.has_prev());
        assert_eq!(p.next_num(), Some(2));
        assert_eq!(p.prev_num(), None);
    }

    #[test]
    fn last_full_page_has_no_next() {
        let p = page(2, 6);
        assert!(!p.has_next());
        assert_eq!(p.prev_num(), Some(1));
    }

    #[test]
    fn page_beyond_data_only_links_back() {
        let p = page(9, 4);
        assert_eq!(p.next_num(), None);
        assert_eq!(p.prev_num(), Some(8));
    }

    #[test]
    fn empty_listing_has_no_links() {
        let p = page(1, 0);
        assert_eq!(p.next_num(), None);
        assert_eq!(p.prev_num(), None);
    }

    #[test]
    fn huge_page_numbers_do_not_overflow() {
        let p = page(i64::MAX, 10);
        assert!(!p.has_next());
    }

    #[test]
    fn fetch_clamps_page_and_slices() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE n (v INTEGER);
             INSERT INTO n VALUES (1), (2), (3), (4), (5);",
        )
        .unwrap();

        let first = fetch(
            &conn,
            "SELECT COUNT(*) FROM n",
            "SELECT v FROM n ORDER BY v LIMIT ?1 OFFSET ?2",
            &[],
            0,
            2,
            |row| row.get::<_, i64>(0),
        )
        .unwrap();
        assert_eq!(first.page, 1);
        assert_eq!(first.items, vec![1, 2]);
        assert_eq!(first.total, 5);

        let beyond = fetch(
            &conn,
            "SELECT COUNT(*) FROM n",
            "SELECT v FROM n ORDER BY v LIMIT ?1 OFFSET ?2",
            &[],
            4,
            2,
            |row| row.get::<_, i64>(0),
        )
        .unwrap();
        assert!(beyond.items.is_empty());
        assert!(!beyond.has_next());
    }
}
