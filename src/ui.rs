pub fn render_index(dark_mode: bool) -> String {
    let theme = if dark_mode { "dark" } else { "light" };
    INDEX_HTML.replace("{{THEME}}", theme)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en" data-theme="{{THEME}}">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Attendance Tracker</title>
  <style>
    :root {
      --bg: #eef2ff;
      --card: #ffffff;
      --ink: #1f2937;
      --muted: #6b7280;
      --accent: #2563eb;
      --good: #16a34a;
      --warning: #ca8a04;
      --low: #dc2626;
      --line: #e5e7eb;
    }

    [data-theme="dark"] {
      --bg: #111827;
      --card: #1f2937;
      --ink: #f9fafb;
      --muted: #9ca3af;
      --line: #374151;
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: var(--bg);
      color: var(--ink);
      font-family: "Inter", "Segoe UI", sans-serif;
    }

    header {
      display: flex;
      justify-content: space-between;
      align-items: center;
      padding: 16px 24px;
      background: var(--card);
      border-bottom: 1px solid var(--line);
    }

    main {
      width: min(960px, 100%);
      margin: 0 auto;
      padding: 24px 16px 48px;
      display: grid;
      gap: 20px;
    }

    .card {
      background: var(--card);
      border: 1px solid var(--line);
      border-radius: 16px;
      padding: 20px;
    }

    .subjects {
      display: grid;
      grid-template-columns: repeat(auto-fill, minmax(220px, 1fr));
      gap: 16px;
    }

    .subject {
      cursor: pointer;
    }

    .pct {
      font-size: 1.8rem;
      font-weight: 600;
    }

    .pct[data-standing="good"] { color: var(--good); }
    .pct[data-standing="warning"] { color: var(--warning); }
    .pct[data-standing="low"] { color: var(--low); }

    .muted {
      color: var(--muted);
      font-size: 0.9rem;
    }

    .grid {
      display: grid;
      grid-template-columns: repeat(7, 1fr);
      gap: 4px;
    }

    .cell {
      min-height: 76px;
      border: 1px solid var(--line);
      border-radius: 8px;
      padding: 6px;
      font-size: 0.85rem;
    }

    .cell .marks {
      display: flex;
      flex-wrap: wrap;
      gap: 2px;
      margin-top: 4px;
    }

    .cell button {
      padding: 2px 4px;
      font-size: 0.7rem;
    }

    .cell button[aria-pressed="true"] {
      background: var(--accent);
      color: #fff;
    }

    button {
      border: 1px solid var(--line);
      border-radius: 8px;
      padding: 8px 12px;
      background: var(--card);
      color: var(--ink);
      cursor: pointer;
    }

    button:disabled {
      opacity: 0.6;
      cursor: progress;
    }

    input {
      padding: 8px;
      border: 1px solid var(--line);
      border-radius: 8px;
      background: var(--card);
      color: var(--ink);
    }

    .status {
      min-height: 1.2em;
      color: var(--low);
    }

    [hidden] {
      display: none !important;
    }
  </style>
</head>
<body>
  <header>
    <strong>Attendance Tracker</strong>
    <div>
      <span id="who" class="muted"></span>
      <button id="theme" type="button">Theme</button>
      <button id="logout" type="button" hidden>Sign out</button>
    </div>
  </header>

  <main>
    <div class="status" id="status"></div>

    <section class="card" id="login" hidden>
      <h2>Sign in</h2>
      <form id="login-form">
        <input name="display_name" placeholder="Name" required />
        <input name="email" type="email" placeholder="Email" required />
        <button type="submit">Sign in</button>
      </form>
    </section>

    <section id="subjects-view" hidden>
      <div class="card">
        <form id="add-form">
          <input name="name" placeholder="Subject name" required />
          <input name="code" placeholder="Code" required />
          <input name="credits" type="number" min="1" placeholder="Credits" />
          <button type="submit" id="add-button">Add subject</button>
        </form>
      </div>
      <div class="subjects" id="subjects"></div>
    </section>

    <section class="card" id="calendar-view" hidden>
      <div>
        <button id="back" type="button">Back</button>
        <strong id="subject-title"></strong>
        <button id="reset" type="button">Reset</button>
        <button id="delete" type="button">Delete</button>
      </div>
      <div>
        <button id="prev" type="button">&lt;</button>
        <span id="month-label"></span>
        <button id="next" type="button">&gt;</button>
      </div>
      <p class="muted" id="calendar-stats"></p>
      <div class="grid" id="weekdays"></div>
      <div class="grid" id="calendar"></div>
    </section>
  </main>

  <script>
    const STATUSES = [
      ['present', 'P'],
      ['absent', 'A'],
      ['half-present', 'HP'],
      ['half-absent', 'HA'],
    ];
    const el = (id) => document.getElementById(id);
    const statusEl = el('status');
    let current = { subject: null, year: null, month: null };

    const setStatus = (message) => {
      statusEl.textContent = message || '';
    };

    const api = async (method, path, body) => {
      const res = await fetch(path, {
        method,
        headers: body ? { 'Content-Type': 'application/json' } : {},
        body: body ? JSON.stringify(body) : undefined,
      });
      const data = await res.json().catch(() => ({}));
      if (!res.ok) {
        throw new Error(data.error || `request failed (${res.status})`);
      }
      return data;
    };

    const show = (view) => {
      el('login').hidden = view !== 'login';
      el('subjects-view').hidden = view !== 'subjects';
      el('calendar-view').hidden = view !== 'calendar';
      el('logout').hidden = view === 'login';
    };

    const statsLine = (stats) =>
      `${stats.present_count}P • ${stats.absent_count}A • ${stats.half_count}H of ${stats.total} classes`;

    const textNode = (tag, className, text) => {
      const node = document.createElement(tag);
      if (className) node.className = className;
      node.textContent = text;
      return node;
    };

    const loadSubjects = async () => {
      const subjects = await api('GET', '/api/subjects');
      const list = el('subjects');
      list.replaceChildren();
      subjects.forEach((subject) => {
        const card = document.createElement('div');
        card.className = 'card subject';
        const pct = textNode('div', 'pct', `${subject.stats.percentage_label}%`);
        pct.dataset.standing = subject.stats.standing;
        card.append(
          textNode('div', 'muted', `${subject.code} • ${subject.credits} credits`),
          textNode('h3', '', subject.name),
          pct,
          textNode('div', 'muted', subject.stats.total > 0 ? statsLine(subject.stats) : 'No classes yet'),
        );
        card.addEventListener('click', () => openCalendar(subject));
        list.appendChild(card);
      });
      show('subjects');
    };

    const renderCalendar = (view) => {
      el('subject-title').textContent = view.subject.name;
      el('month-label').textContent = view.label;
      el('calendar-stats').textContent = `${view.stats.percentage_label}% • ${statsLine(view.stats)}`;
      const grid = el('calendar');
      grid.innerHTML = '';
      view.cells.forEach((cell) => {
        const div = document.createElement('div');
        div.className = 'cell';
        if (cell.date) {
          div.appendChild(textNode('div', '', String(cell.day)));
          const marks = document.createElement('div');
          marks.className = 'marks';
          STATUSES.forEach(([status, label]) => {
            const button = document.createElement('button');
            button.textContent = label;
            button.setAttribute('aria-pressed', String(cell.status === status));
            button.disabled = cell.pending || cell.status === status;
            button.addEventListener('click', () => markDay(cell.date, status, marks));
            marks.appendChild(button);
          });
          div.appendChild(marks);
        }
        grid.appendChild(div);
      });
      current.year = view.month.year;
      current.month = view.month.month;
      current.prev = view.previous;
      current.next = view.next;
    };

    const loadCalendar = async (year, month) => {
      const query = year ? `?year=${year}&month=${month}` : '';
      const view = await api('GET', `/api/subjects/${current.subject.id}/calendar${query}`);
      renderCalendar(view);
      show('calendar');
    };

    const openCalendar = async (subject) => {
      current.subject = subject;
      try {
        await loadCalendar();
      } catch (err) {
        setStatus(err.message);
      }
    };

    const markDay = async (date, status, marks) => {
      marks.querySelectorAll('button').forEach((b) => (b.disabled = true));
      try {
        await api('PUT', `/api/subjects/${current.subject.id}/attendance/${date}`, { status });
        setStatus('');
      } catch (err) {
        setStatus(`Could not mark attendance: ${err.message}`);
      }
      await loadCalendar(current.year, current.month);
    };

    const destructive = async (kind) => {
      const button = el(kind);
      const ticket = await api('POST', `/api/subjects/${current.subject.id}/${kind}`);
      const confirmed = window.confirm(ticket.message);
      button.disabled = true;
      try {
        await api('POST', `/api/confirmations/${ticket.token}`, { confirm: confirmed });
        if (confirmed && kind === 'delete') {
          await loadSubjects();
        } else {
          await loadCalendar(current.year, current.month);
        }
      } catch (err) {
        window.alert(err.message);
      } finally {
        button.disabled = false;
      }
    };

    const refreshSession = async () => {
      const session = await api('GET', '/api/session');
      if (session.user) {
        el('who').textContent = `Hello, ${session.user.display_name}`;
        await loadSubjects();
      } else {
        el('who').textContent = '';
        show('login');
      }
    };

    el('login-form').addEventListener('submit', async (event) => {
      event.preventDefault();
      const form = new FormData(event.target);
      const button = event.target.querySelector('button');
      button.disabled = true;
      try {
        await api('POST', '/api/session/sign-in', {
          display_name: form.get('display_name'),
          email: form.get('email'),
        });
        setStatus('');
        await refreshSession();
      } catch (err) {
        setStatus(`Sign-in failed: ${err.message}`);
      } finally {
        button.disabled = false;
      }
    });

    el('add-form').addEventListener('submit', async (event) => {
      event.preventDefault();
      const form = new FormData(event.target);
      const button = el('add-button');
      button.disabled = true;
      try {
        const credits = parseInt(form.get('credits'), 10);
        await api('POST', '/api/subjects', {
          name: form.get('name'),
          code: form.get('code'),
          credits: Number.isNaN(credits) ? null : credits,
        });
        event.target.reset();
        setStatus('');
        await loadSubjects();
      } catch (err) {
        setStatus(`Could not add subject: ${err.message}`);
      } finally {
        button.disabled = false;
      }
    });

    el('logout').addEventListener('click', async () => {
      await api('POST', '/api/session/sign-out').catch((err) => setStatus(err.message));
      await refreshSession();
    });

    el('theme').addEventListener('click', async () => {
      const pref = await api('POST', '/api/preferences/theme/toggle');
      document.documentElement.dataset.theme = pref.dark_mode ? 'dark' : 'light';
    });

    el('back').addEventListener('click', () => loadSubjects().catch((err) => setStatus(err.message)));
    el('reset').addEventListener('click', () => destructive('reset').catch((err) => setStatus(err.message)));
    el('delete').addEventListener('click', () => destructive('delete').catch((err) => setStatus(err.message)));
    el('prev').addEventListener('click', () => loadCalendar(current.prev.year, current.prev.month));
    el('next').addEventListener('click', () => loadCalendar(current.next.year, current.next.month));

    el('weekdays').innerHTML = ['Sun', 'Mon', 'Tue', 'Wed', 'Thu', 'Fri', 'Sat']
      .map((day) => `<div class="muted">${day}</div>`)
      .join('');

    refreshSession().catch((err) => setStatus(err.message));
  </script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_carries_theme() {
        assert!(render_index(true).contains(r#"data-theme="dark""#));
        assert!(render_index(false).contains(r#"data-theme="light""#));
        assert!(!render_index(false).contains("{{THEME}}"));
    }

    #[test]
    fn subject_fields_are_inserted_as_text() {
        let html = render_index(false);
        assert!(!html.contains("${subject.name}"));
        assert!(html.contains("textNode('h3', '', subject.name)"));
        assert!(html.contains("`${subject.code} • ${subject.credits} credits`"));
        assert!(!html.contains("card.innerHTML"));
    }
}
