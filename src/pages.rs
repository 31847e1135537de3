//! # Pages
//!
//! Server-rendered HTML for the landing page, the results page and the error
//! page. Everything that originates from the request or the index is escaped
//! before it is written into the markup; highlight fragments keep only the
//! `<em>` tags the search service wraps around matched terms.

use url::form_urlencoded;

use crate::query::{FacetType, SortKey, TranslatedQuery};
use crate::search::{SearchHit, SearchResultPage};

/// Escapes text for use in HTML element content and quoted attributes.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Escapes a highlight fragment, then restores the `<em>` markers.
fn highlight_html(fragment: &str) -> String {
    html_escape(fragment)
        .replace("&lt;em&gt;", "<em>")
        .replace("&lt;/em&gt;", "</em>")
}

/// Relative `/search` link carrying the given search, facet and sort.
pub fn search_link(search: &str, facet: Option<(FacetType, &str)>, sort: SortKey) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("search", search);
    if let Some((facet_type, value)) = facet {
        query.append_pair("facet", value);
        query.append_pair("facet_type", facet_type.as_str());
    }
    if sort != SortKey::Relevance {
        query.append_pair("sort", sort.as_str());
    }
    format!("/search?{}", query.finish())
}

fn layout(site_title: &str, heading: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{site} - {heading}</title>
    <style>
        body {{
            font-family: "Segoe UI", Helvetica, Arial, sans-serif;
            margin: 0;
            background-color: #f5f7fa;
            color: #1f2933;
        }}
        header {{
            background-color: #0b5394;
            color: #ffffff;
            padding: 16px 32px;
        }}
        header a {{ color: #ffffff; text-decoration: none; }}
        main {{ max-width: 1100px; margin: 0 auto; padding: 24px 32px; }}
        form.search input[type=text] {{ width: 60%; padding: 8px; font-size: 1rem; }}
        form.search button {{ padding: 8px 16px; font-size: 1rem; }}
        .layout {{ display: grid; grid-template-columns: 240px 1fr; gap: 24px; }}
        .facets h3 {{ margin-bottom: 4px; }}
        .facets ul {{ list-style: none; padding-left: 0; margin-top: 0; }}
        .hotel {{
            background-color: #ffffff;
            border: 1px solid #d9e2ec;
            border-radius: 6px;
            padding: 12px 16px;
            margin-bottom: 12px;
        }}
        .hotel h2 {{ margin: 0 0 4px 0; font-size: 1.2rem; }}
        .meta {{ color: #52606d; font-size: 0.9rem; }}
        .tag {{
            display: inline-block;
            background-color: #e6f0fa;
            border-radius: 3px;
            padding: 1px 6px;
            margin: 2px;
            font-size: 0.85rem;
        }}
        .sort a.active {{ font-weight: bold; }}
        .error {{ color: #b00020; }}
        em {{ background-color: #fff3b0; font-style: normal; }}
    </style>
</head>
<body>
    <header><a href="/"><strong>{site}</strong></a></header>
    <main>
{body}
    </main>
</body>
</html>
"#,
        site = html_escape(site_title),
        heading = html_escape(heading),
        body = body
    )
}

fn search_form(search_terms: &str) -> String {
    format!(
        r#"        <form class="search" action="/search" method="get">
            <input type="text" name="search" value="{}" placeholder="Search for hotels, e.g. pool, spa, airport">
            <button type="submit">Search</button>
        </form>"#,
        html_escape(search_terms)
    )
}

fn example_list(example_searches: &[String]) -> String {
    if example_searches.is_empty() {
        return String::new();
    }
    let items = example_searches
        .iter()
        .map(|example| {
            format!(
                r#"<a class="tag" href="{}">{}</a>"#,
                html_escape(&search_link(example, None, SortKey::Relevance)),
                html_escape(example)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("        <p>Try one of these searches:</p>\n        <div>{}</div>", items)
}

/// Landing page with an empty search box.
pub fn home_page(site_title: &str, example_searches: &[String]) -> String {
    let body = format!(
        "        <h1>Find your hotel</h1>\n{}\n{}",
        search_form(""),
        example_list(example_searches)
    );
    layout(site_title, "Home", &body)
}

/// Results page shown when there is nothing to search for yet.
pub fn prompt_page(site_title: &str, message: &str, example_searches: &[String]) -> String {
    let body = format!(
        "{}\n        <p class=\"error\">{}</p>\n{}",
        search_form(""),
        html_escape(message),
        example_list(example_searches)
    );
    layout(site_title, "Search", &body)
}

/// Results page for a completed search.
pub fn results_page(
    site_title: &str,
    query: &TranslatedQuery,
    page: &SearchResultPage,
    example_searches: &[String],
) -> String {
    let facet = query
        .facet
        .as_ref()
        .map(|(facet_type, value)| (*facet_type, value.as_str()));
    let total = page.total_count.unwrap_or(page.hits.len() as u64);

    let sort_links = SortKey::ALL
        .iter()
        .map(|key| {
            let class = if *key == query.sort_key { " class=\"active\"" } else { "" };
            format!(
                r#"<a{} href="{}">{}</a>"#,
                class,
                html_escape(&search_link(&query.search_text, facet, *key)),
                key.label()
            )
        })
        .collect::<Vec<_>>()
        .join(" | ");

    let active_filter = match facet {
        Some((facet_type, value)) => format!(
            r#"<p class="meta">Filtered by {}: <strong>{}</strong> (<a href="{}">clear</a>)</p>"#,
            facet_type,
            html_escape(value),
            html_escape(&search_link(&query.search_text, None, query.sort_key))
        ),
        None => String::new(),
    };

    let facet_panels = FacetType::ALL
        .iter()
        .filter(|facet_type| !page.facet(**facet_type).is_empty())
        .map(|facet_type| {
            let items = page
                .facet(*facet_type)
                .iter()
                .map(|bucket| {
                    let value = bucket.value_text();
                    format!(
                        r#"<li><a href="{}">{}</a> ({})</li>"#,
                        html_escape(&search_link(
                            &query.search_text,
                            Some((*facet_type, value.as_str())),
                            query.sort_key
                        )),
                        html_escape(&value),
                        bucket.count
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            format!("<h3>{}</h3>\n<ul>\n{}\n</ul>", facet_type, items)
        })
        .collect::<Vec<_>>()
        .join("\n");

    let hits = if page.hits.is_empty() {
        "<p>No hotels matched your search.</p>".to_string()
    } else {
        page.hits.iter().map(hotel_card).collect::<Vec<_>>().join("\n")
    };

    let body = format!(
        r#"{form}
        <p>{total} result(s) for <strong>{terms}</strong></p>
        {active_filter}
        <p class="sort">Sort by: {sort_links}</p>
        <div class="layout">
            <aside class="facets">
{facet_panels}
            </aside>
            <section>
{hits}
            </section>
        </div>
{examples}"#,
        form = search_form(&query.search_text),
        total = total,
        terms = html_escape(&query.search_text),
        active_filter = active_filter,
        sort_links = sort_links,
        facet_panels = facet_panels,
        hits = hits,
        examples = example_list(example_searches)
    );
    layout(site_title, "Search results", &body)
}

fn hotel_card(hit: &SearchHit) -> String {
    let hotel = &hit.hotel;

    let name = match hit.highlight("HotelName") {
        Some(fragment) => highlight_html(fragment),
        None => html_escape(hotel.hotel_name.as_deref().unwrap_or("Unnamed hotel")),
    };
    let description = match hit.highlight("Description") {
        Some(fragment) => highlight_html(fragment),
        None => html_escape(hotel.description.as_deref().unwrap_or_default()),
    };

    let mut meta = Vec::new();
    if let Some(category) = &hotel.category {
        meta.push(html_escape(category));
    }
    if let Some(rating) = hotel.rating {
        meta.push(format!("Rating {:.1}", rating));
    }
    match hotel.parking_included {
        Some(true) => meta.push("Parking included".to_string()),
        Some(false) => meta.push("No parking".to_string()),
        None => {}
    }
    if let Some(renovated) = hotel.last_renovation_date {
        meta.push(format!("Renovated {}", renovated.format("%Y-%m-%d")));
    }

    let address = hotel
        .address
        .as_ref()
        .map(|address| address.one_line())
        .filter(|line| !line.is_empty())
        .map(|line| format!(r#"<p class="meta">{}</p>"#, html_escape(&line)))
        .unwrap_or_default();

    let tags = hotel
        .tags
        .iter()
        .map(|tag| format!(r#"<span class="tag">{}</span>"#, html_escape(tag)))
        .collect::<Vec<_>>()
        .join("");

    let enrichment = [
        ("Key phrases", &hotel.keyphrases),
        ("Locations", &hotel.locations),
        ("People", &hotel.people),
        ("Organizations", &hotel.organizations),
    ]
    .into_iter()
    .filter(|(_, values)| !values.is_empty())
    .map(|(label, values)| {
        format!(
            r#"<p class="meta">{}: {}</p>"#,
            label,
            html_escape(&values.join(", "))
        )
    })
    .collect::<Vec<_>>()
    .join("\n");

    format!(
        r#"<div class="hotel">
    <h2>{}</h2>
    <p class="meta">{}</p>
    {}
    <p>{}</p>
    <div>{}</div>
    {}
</div>"#,
        name,
        meta.join(" · "),
        address,
        description,
        tags,
        enrichment
    )
}

/// Generic error page.
pub fn error_page(site_title: &str, message: &str) -> String {
    let body = format!(
        "        <h1>Something went wrong</h1>\n        <p class=\"error\">{}</p>\n        <p><a href=\"/\">Back to search</a></p>",
        html_escape(message)
    );
    layout(site_title, "Error", &body)
}
